//! Answer extraction from resolver responses.
//!
//! Parses the raw DNS response embedded in a dnstap message and renders
//! each answer-section record into a normalized [`Answer`].

use chrono::{DateTime, TimeZone, Utc};
use hickory_proto::op::{Message as DnsMessage, ResponseCode};
use hickory_proto::rr::{RData, Record, RecordType};
use passivedns_domain::answer::strip_root_dot;
use passivedns_domain::Answer;
use passivedns_proto::{message, Message};
use tracing::warn;

/// The record types the persistent sink keeps by default: addresses and
/// the aliases leading to them.
pub fn address_record_types() -> Vec<u16> {
    vec![
        u16::from(RecordType::A),
        u16::from(RecordType::AAAA),
        u16::from(RecordType::CNAME),
    ]
}

/// Extracts answers from a dnstap message.
///
/// Yields nothing unless the message is a resolver response carrying a
/// payload, the payload parses, and its response code is NOERROR. `types`
/// is an allow-list of record type codes; empty keeps every record.
/// Records that cannot be rendered are logged and skipped; a payload that
/// does not parse is logged and yields nothing, affecting only this
/// message.
pub fn extract_answers(message: &Message, types: &[u16]) -> Vec<Answer> {
    if message.r#type() != message::Type::ResolverResponse {
        return Vec::new();
    }
    let payload = match message.response_message.as_deref() {
        Some(payload) if !payload.is_empty() => payload,
        _ => return Vec::new(),
    };

    let msg = match DnsMessage::from_vec(payload) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, "Failed to parse DNS response message");
            return Vec::new();
        }
    };
    if msg.response_code() != ResponseCode::NoError {
        return Vec::new();
    }

    let time = response_time(message);
    let mut answers = Vec::with_capacity(msg.answers().len());
    for record in msg.answers() {
        let rtype = record.record_type();
        if !types.is_empty() && !types.contains(&u16::from(rtype)) {
            continue;
        }
        let data = match render_data(record) {
            Some(data) => data,
            None => {
                warn!(record = %record, "No data rendering for record");
                continue;
            }
        };
        answers.push(Answer {
            id: msg.id(),
            time,
            name: strip_root_dot(&record.name().to_utf8()).to_string(),
            ttl: record.ttl(),
            class: u16::from(record.dns_class()),
            class_name: record.dns_class().to_string(),
            rtype: u16::from(rtype),
            type_name: rtype.to_string(),
            data: strip_root_dot(&data).to_string(),
        });
    }
    answers
}

fn response_time(message: &Message) -> DateTime<Utc> {
    let sec = message.response_time_sec.unwrap_or(0) as i64;
    let nsec = message.response_time_nsec.unwrap_or(0);
    Utc.timestamp_opt(sec, nsec).single().unwrap_or_default()
}

/// Renders one record's payload as text.
///
/// Addresses and name-valued records get dedicated arms; key, signature
/// and digest records use their zone-format display (numeric fields plus
/// encoded material). Everything else falls back to the whole record's
/// zone-format line with the four leading header fields (owner, ttl,
/// class, type) stripped off. The fallback assumes that rendering always
/// leads with exactly those four fields; records whose rendering has no
/// payload fields after them are unrenderable.
fn render_data(record: &Record) -> Option<String> {
    match record.data() {
        RData::A(a) => Some(a.to_string()),
        RData::AAAA(aaaa) => Some(aaaa.to_string()),
        RData::CNAME(cname) => Some(cname.to_string()),
        RData::NS(ns) => Some(ns.to_string()),
        RData::PTR(ptr) => Some(ptr.to_string()),
        RData::ANAME(aname) => Some(aname.to_string()),
        RData::SSHFP(sshfp) => Some(sshfp.to_string()),
        RData::TLSA(tlsa) => Some(tlsa.to_string()),
        RData::OPENPGPKEY(key) => Some(key.to_string()),
        RData::DNSSEC(inner) => Some(inner.to_string()),
        _ => {
            let rendered = record.to_string();
            let fields: Vec<&str> = rendered.split_whitespace().collect();
            if fields.len() > 4 {
                Some(fields[4..].join(" "))
            } else {
                None
            }
        }
    }
}
