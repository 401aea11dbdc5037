use crate::error::{PaymentRequestError, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Placeholder in `target` replaced by the hash of the last created request.
pub const LAST_HASH: &str = "$last";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Get,
    Post,
    Put,
    Process,
    Notify,
    Pay,
    #[serde(rename = "after_pay")]
    AfterPay,
}

/// One API call of a replay script.
///
/// `target` is a hash (`get`, `put`, `process`), an order token (`post`, `pay`,
/// `after_pay`) or a gateway name (`notify`); `body` is the raw JSON request body.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ScriptCommand {
    pub op: Operation,
    pub target: String,
    #[serde(default)]
    pub body: String,
}

impl ScriptCommand {
    /// Substitutes [`LAST_HASH`] in target and body.
    pub fn resolve(mut self, last_hash: Option<&str>) -> Result<Self> {
        let uses_last = self.target.contains(LAST_HASH) || self.body.contains(LAST_HASH);
        if !uses_last {
            return Ok(self);
        }
        let hash = last_hash.ok_or_else(|| {
            PaymentRequestError::MalformedBody(format!(
                "{LAST_HASH} used before any payment request was created"
            ))
        })?;
        self.target = self.target.replace(LAST_HASH, hash);
        self.body = self.body.replace(LAST_HASH, hash);
        Ok(self)
    }
}

/// Reads API calls from a CSV replay script (`op,target,body`).
pub struct ScriptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScriptReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and deserializes commands, one per row.
    pub fn commands(self) -> impl Iterator<Item = Result<ScriptCommand>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentRequestError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_valid_stream() {
        let data = "op,target,body\n\
                    post,nAWw2jewpA,\"{\"\"paymentId\"\": 10}\"\n\
                    get,$last\n";
        let results: Vec<Result<ScriptCommand>> = ScriptReader::new(data.as_bytes()).commands().collect();

        assert_eq!(results.len(), 2);
        let post = results[0].as_ref().unwrap();
        assert_eq!(post.op, Operation::Post);
        assert_eq!(post.body, "{\"paymentId\": 10}");
        let get = results[1].as_ref().unwrap();
        assert_eq!(get.op, Operation::Get);
        assert_eq!(get.body, "");
    }

    #[test]
    fn test_reader_checkout_operations() {
        let data = "op,target,body\n\
                    pay,nAWw2jewpA,\n\
                    after_pay,nAWw2jewpA,\"{\"\"hash\"\": \"\"$last\"\"}\"\n";
        let commands: Vec<ScriptCommand> = ScriptReader::new(data.as_bytes())
            .commands()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(commands[0].op, Operation::Pay);
        assert_eq!(commands[1].op, Operation::AfterPay);
        assert_eq!(commands[1].body, "{\"hash\": \"$last\"}");
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "op,target,body\ndelete,abc,";
        let results: Vec<Result<ScriptCommand>> = ScriptReader::new(data.as_bytes()).commands().collect();
        assert!(results[0].is_err());
    }

    #[test]
    fn test_last_hash_substitution() {
        let command = ScriptCommand {
            op: Operation::Notify,
            target: "sandbox".into(),
            body: format!("{{\"hash\": \"{LAST_HASH}\"}}"),
        };

        let resolved = command.clone().resolve(Some("abc")).unwrap();
        assert_eq!(resolved.body, "{\"hash\": \"abc\"}");
        assert!(command.resolve(None).is_err());
    }
}
