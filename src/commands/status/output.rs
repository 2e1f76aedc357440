//! Output formatting for status command results.

use super::execute::StatusResult;
use crate::output::Outputable;

impl Outputable for StatusResult {
    fn to_table(&self) -> String {
        format!("{}: {}", self.backend, self.status)
    }
}
