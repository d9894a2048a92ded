use crate::error::Error;

/// The `Q` question type. Everything else is answered with an empty `END`.
pub(super) const QUERY: &str = "Q";

/// One ABI version 1 question line: `Q qname qclass qtype id remote-ip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Question<'a> {
    pub question_type: &'a str,
    pub qname: &'a str,
    pub qclass: &'a str,
    pub qtype: &'a str,
    pub id: &'a str,
    pub remote_ip: &'a str,
}

impl<'a> Question<'a> {
    pub(super) fn parse(line: &'a str) -> Result<Self, Error> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields[..] {
            [question_type, qname, qclass, qtype, id, remote_ip] => Ok(Question {
                question_type,
                qname,
                qclass,
                qtype,
                id,
                remote_ip,
            }),
            _ => Err(Error::MalformedQuestion(line.trim_end().to_string())),
        }
    }

    pub(super) fn is_query(&self) -> bool {
        self.question_type == QUERY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_fields() {
        let q = Question::parse("Q\t_acme-challenge.example.com\tIN\tTXT\t-1\t192.0.2.1\n").unwrap();
        assert!(q.is_query());
        assert_eq!(q.qname, "_acme-challenge.example.com");
        assert_eq!(q.qclass, "IN");
        assert_eq!(q.qtype, "TXT");
        assert_eq!(q.id, "-1");
        assert_eq!(q.remote_ip, "192.0.2.1");
    }

    #[test]
    fn any_whitespace_separates() {
        let q = Question::parse("R random correct number of things").unwrap();
        assert!(!q.is_query());
        assert_eq!(q.remote_ip, "things");
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        for line in ["", "RANDOMGARBAGE", "DEBUGQUIT", "Q example.com IN ANY -1", "AXFR 1 2 3 4 5 6"] {
            assert!(
                matches!(Question::parse(line), Err(Error::MalformedQuestion(_))),
                "{line:?}"
            );
        }
    }
}
