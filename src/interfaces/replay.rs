use super::api::{CREATED, OK, ShopApi};
use super::csv::script_reader::{Operation, ScriptReader};
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;
use std::io::{Read, Write};

/// One line of replay output.
#[derive(Debug, Serialize)]
pub struct ReplayLine<'a> {
    pub op: Operation,
    pub target: &'a str,
    pub status: u16,
    pub body: &'a Value,
}

/// Replays every script command against `api`, writing one JSON line per call to `out`.
///
/// Unreadable commands are reported on stderr and skipped.
pub async fn replay<R: Read, W: Write>(api: &ShopApi, script: ScriptReader<R>, mut out: W) -> Result<()> {
    let mut last_hash: Option<String> = None;

    for command in script.commands() {
        let command = match command.and_then(|c| c.resolve(last_hash.as_deref())) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("Error reading command: {}", e);
                continue;
            }
        };

        let body = command.body.as_bytes();
        let response = match command.op {
            Operation::Get => api.get_payment_request(&command.target).await,
            Operation::Post => api.post_payment_request(&command.target, body).await,
            Operation::Put => api.put_payment_request(&command.target, body).await,
            Operation::Process => api.process_payment_request(&command.target).await,
            Operation::Notify => api.notify(&command.target, body).await,
            Operation::Pay => api.pay_order(&command.target, body).await,
            Operation::AfterPay => api.after_pay(&command.target, body).await,
        };

        let created = match command.op {
            Operation::Post => response.status == CREATED,
            Operation::Pay => response.status == OK,
            _ => false,
        };
        if created && let Some(hash) = response.body["hash"].as_str() {
            last_hash = Some(hash.to_string());
        }

        let line = ReplayLine {
            op: command.op,
            target: &command.target,
            status: response.status,
            body: &response.body,
        };
        serde_json::to_writer(&mut out, &line)?;
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}
