//! CLI parsing tests for schema command using the test DSL.

#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use clap::Parser;
    use rstest::rstest;

    crate::cli_defaults_test! {
        command: "schema",
        variant: Schema,
        required_args: [],
        defaults: {
            name: None,
        },
    }

    crate::cli_option_test! {
        command: "schema",
        variant: Schema,
        test_name: test_schema_with_name,
        args: ["--name", "movies"],
        field: name,
        expected: Some("movies".to_string()),
    }

    #[rstest]
    fn test_schema_name_and_global_database() {
        let args = Args::try_parse_from(["tasty", "schema", "-n", "movies", "-d", ":memory:"]).unwrap();
        assert_eq!(args.database.as_deref(), Some(":memory:"));
        match args.command {
            crate::commands::Command::Schema(cmd) => assert_eq!(cmd.name.as_deref(), Some("movies")),
            _ => panic!("Expected Schema command"),
        }
    }
}
