//! CLI parsing tests for generate command using the test DSL.

#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use crate::generators::BackendKind;
    use clap::Parser;
    use rstest::rstest;
    use std::path::PathBuf;

    crate::cli_required_arg_test! {
        command: "generate",
        test_name: test_generate_requires_query,
        required_arg: "--query",
    }

    crate::cli_defaults_test! {
        command: "generate",
        variant: Generate,
        required_args: ["--query", "movies.json"],
        defaults: {
            backend: None,
            placeholders: false,
        },
    }

    crate::cli_option_test! {
        command: "generate",
        variant: Generate,
        test_name: test_generate_with_query,
        args: ["-q", "movies.json"],
        field: query,
        expected: PathBuf::from("movies.json"),
    }

    crate::cli_option_test! {
        command: "generate",
        variant: Generate,
        test_name: test_generate_with_backend,
        args: ["--query", "movies.json", "--backend", "mysql"],
        field: backend,
        expected: Some(BackendKind::MySql),
    }

    crate::cli_option_test! {
        command: "generate",
        variant: Generate,
        test_name: test_generate_with_placeholders,
        args: ["--query", "movies.json", "-p"],
        field: placeholders,
        expected: true,
    }

    crate::cli_error_test! {
        command: "generate",
        test_name: test_generate_unknown_backend_rejected,
        args: ["--query", "movies.json", "--backend", "oracle"],
    }

    #[rstest]
    #[case("postgres", BackendKind::Postgres)]
    #[case("sqlite", BackendKind::Sqlite)]
    #[case("elastic", BackendKind::Elastic)]
    fn test_generate_backend_names(#[case] name: &str, #[case] expected: BackendKind) {
        let args = Args::try_parse_from(["tasty", "generate", "-q", "movies.json", "-b", name]).unwrap();
        match args.command {
            crate::commands::Command::Generate(cmd) => assert_eq!(cmd.backend, Some(expected)),
            _ => panic!("Expected Generate command"),
        }
    }
}
