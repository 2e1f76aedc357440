//! CLI parsing tests for run command using the test DSL.

#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use clap::Parser;
    use rstest::rstest;
    use std::path::PathBuf;

    crate::cli_required_arg_test! {
        command: "run",
        test_name: test_run_requires_query,
        required_arg: "--query",
    }

    crate::cli_option_test! {
        command: "run",
        variant: Run,
        test_name: test_run_with_query,
        args: ["--query", "movies.json"],
        field: query,
        expected: PathBuf::from("movies.json"),
    }

    crate::cli_error_test! {
        command: "run",
        test_name: test_run_rejects_placeholders_flag,
        args: ["--query", "movies.json", "--placeholders"],
    }
}
