//! The message both channels deliver.

/// One HTML mail to a set of recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipients: Vec<String>,
    pub subject: String,
    pub html_body: String,
    pub reply_to: Option<String>,
}

impl Notification {
    /// Failure notice for `file_name`: subject `Import Error - <file_name>`.
    pub fn import_failure(
        file_name: &str,
        recipients: Vec<String>,
        html_body: String,
        reply_to: Option<String>,
    ) -> Self {
        Self {
            recipients,
            subject: format!("Import Error - {file_name}"),
            html_body,
            reply_to: reply_to.filter(|r| !r.trim().is_empty()),
        }
    }

    /// Recipients in the relay's list format: each followed by `;`.
    pub fn joined_recipients(&self) -> String {
        self.recipients.iter().map(|to| format!("{to};")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn subject_names_the_file() {
        let n = Notification::import_failure("WOH1001.txt", vec![], String::new(), None);
        assert_eq!(n.subject, "Import Error - WOH1001.txt");
    }

    #[test]
    fn recipients_join_with_trailing_separator() {
        let n = Notification::import_failure(
            "WOH1.txt",
            vec!["a@example.com".into(), "b@example.com".into()],
            String::new(),
            None,
        );
        assert_eq!(n.joined_recipients(), "a@example.com;b@example.com;");
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(""), None)]
    #[case(Some("  "), None)]
    #[case(Some("lead@example.com"), Some("lead@example.com"))]
    fn reply_to_only_when_set(#[case] configured: Option<&str>, #[case] expected: Option<&str>) {
        let n = Notification::import_failure(
            "WOH1.txt",
            vec![],
            String::new(),
            configured.map(str::to_owned),
        );
        assert_eq!(n.reply_to.as_deref(), expected);
    }
}
