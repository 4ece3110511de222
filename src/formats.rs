// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! `format` checkers and `contentEncoding`/`contentMediaType` checks.
//!
//! Whether a format asserts is decided at compile time: Draft 4, 6 and 7 assert by default,
//! 2019-09 and 2020-12 only annotate unless format assertions are switched on. Unknown
//! formats never fail.

use crate::utils::pointer;
use core::fmt;
use lazy_static::lazy_static;
use serde_json::Value;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use url::Url;

/// A predicate over string instances.
#[derive(Clone)]
pub enum FormatChecker {
    Builtin(fn(&str) -> bool),
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl FormatChecker {
    pub fn check(&self, value: &str) -> bool {
        match self {
            FormatChecker::Builtin(f) => f(value),
            FormatChecker::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for FormatChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatChecker::Builtin(_) => f.write_str("Builtin"),
            FormatChecker::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// The built-in checker for `name`, if there is one.
pub fn builtin(name: &str) -> Option<FormatChecker> {
    let check: fn(&str) -> bool = match name {
        #[cfg(feature = "formats")]
        "date-time" => is_date_time,
        #[cfg(feature = "formats")]
        "date" => is_date,
        "time" => is_time,
        "duration" => is_duration,
        "email" => is_email,
        "idn-email" => is_idn_email,
        "hostname" => is_hostname,
        "idn-hostname" => is_idn_hostname,
        "ipv4" => is_ipv4,
        "ipv6" => is_ipv6,
        "uri" => is_uri,
        "uri-reference" => is_uri_reference,
        "iri" => is_iri,
        "iri-reference" => is_iri_reference,
        "uri-template" => is_uri_template,
        #[cfg(feature = "formats")]
        "uuid" => is_uuid,
        "regex" => is_regex,
        "json-pointer" => is_json_pointer,
        "relative-json-pointer" => is_relative_json_pointer,
        _ => return None,
    };
    Some(FormatChecker::Builtin(check))
}

fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(feature = "formats")]
fn is_date(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return false;
    }
    let (Some(year), Some(month), Some(day)) = (
        s.get(0..4).and_then(digits),
        s.get(5..7).and_then(digits),
        s.get(8..10).and_then(digits),
    ) else {
        return false;
    };
    chrono::NaiveDate::from_ymd_opt(year as i32, month, day).is_some()
}

#[cfg(feature = "formats")]
fn is_date_time(s: &str) -> bool {
    match (s.get(..10), s.get(10..11), s.get(11..)) {
        (Some(date), Some("T" | "t"), Some(time)) => is_date(date) && is_time(time),
        _ => false,
    }
}

/// RFC 3339 `full-time`, including leap seconds at 23:59:60 UTC.
fn is_time(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() < 9 || b[2] != b':' || b[5] != b':' {
        return false;
    }
    let (Some(hour), Some(minute), Some(second)) = (
        s.get(0..2).and_then(digits),
        s.get(3..5).and_then(digits),
        s.get(6..8).and_then(digits),
    ) else {
        return false;
    };
    let mut rest = &s[8..];
    if let Some(fraction) = rest.strip_prefix('.') {
        let len = fraction.bytes().take_while(u8::is_ascii_digit).count();
        if len == 0 {
            return false;
        }
        rest = &fraction[len..];
    }
    let offset: i64 = match rest {
        "Z" | "z" => 0,
        _ => {
            let sign = match rest.as_bytes().first() {
                Some(b'+') => 1,
                Some(b'-') => -1,
                _ => return false,
            };
            if rest.len() != 6 || rest.as_bytes()[3] != b':' {
                return false;
            }
            let (Some(oh), Some(om)) = (rest.get(1..3).and_then(digits), rest.get(4..6).and_then(digits))
            else {
                return false;
            };
            if oh > 23 || om > 59 {
                return false;
            }
            sign * i64::from(oh * 60 + om)
        }
    };
    if hour > 23 || minute > 59 || second > 60 {
        return false;
    }
    if second == 60 {
        let utc = (i64::from(hour * 60 + minute) - offset).rem_euclid(24 * 60);
        return utc == 23 * 60 + 59;
    }
    true
}

/// ISO 8601 durations as profiled by RFC 3339 appendix A.
fn is_duration(s: &str) -> bool {
    let Some(rest) = s.strip_prefix('P') else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }
    if let Some(weeks) = rest.strip_suffix('W') {
        return digits(weeks).is_some();
    }
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };
    if !duration_units(date, &['Y', 'M', 'D']) {
        return false;
    }
    match time {
        Some(time) => !time.is_empty() && duration_units(time, &['H', 'M', 'S']),
        None => true,
    }
}

fn duration_units(part: &str, allowed: &[char]) -> bool {
    let mut next = 0;
    let mut pending = 0;
    for c in part.chars() {
        if c.is_ascii_digit() {
            pending += 1;
            continue;
        }
        if pending == 0 {
            return false;
        }
        match allowed.get(next..).and_then(|rest| rest.iter().position(|u| *u == c)) {
            Some(i) => {
                next += i + 1;
                pending = 0;
            }
            None => return false,
        }
    }
    pending == 0
}

fn email_parts(s: &str) -> Option<(&str, &str)> {
    let (local, domain) = s.rsplit_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some((local, domain))
}

fn is_local_part(local: &str, international: bool) -> bool {
    if local.len() >= 2 && local.starts_with('"') && local.ends_with('"') {
        return true;
    }
    !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || "!#$%&'*+-/=?^_`{|}~.".contains(c)
                || (international && !c.is_ascii())
        })
}

fn is_address_literal(domain: &str) -> Option<bool> {
    let literal = domain.strip_prefix('[')?.strip_suffix(']')?;
    Some(match literal.strip_prefix("IPv6:") {
        Some(v6) => is_ipv6(v6),
        None => is_ipv4(literal),
    })
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = email_parts(s) else {
        return false;
    };
    is_local_part(local, false) && is_address_literal(domain).unwrap_or_else(|| is_hostname(domain))
}

fn is_idn_email(s: &str) -> bool {
    let Some((local, domain)) = email_parts(s) else {
        return false;
    };
    is_local_part(local, true)
        && is_address_literal(domain).unwrap_or_else(|| is_idn_hostname(domain))
}

fn hostname_with(s: &str, label_char: impl Fn(char) -> bool) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(&label_char)
    })
}

fn is_hostname(s: &str) -> bool {
    hostname_with(s, |c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_idn_hostname(s: &str) -> bool {
    hostname_with(s, |c| c.is_alphanumeric() || c == '-' || (!c.is_ascii() && !c.is_whitespace()))
}

fn is_ipv4(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

fn is_ipv6(s: &str) -> bool {
    s.parse::<Ipv6Addr>().is_ok()
}

/// Characters that may never appear in a URI, and malformed percent escapes.
fn has_illegal_uri_chars(s: &str) -> bool {
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b.is_ascii_control() || b" \"<>\\^`{|}".contains(&b) {
            return true;
        }
        if b == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return true;
            }
        }
    }
    false
}

lazy_static! {
    #[allow(clippy::expect_used)] // constant input
    static ref REFERENCE_BASE: Url =
        Url::parse("http://example.com/").expect("constant base should be a valid URI");
}

fn is_uri(s: &str) -> bool {
    s.is_ascii() && is_iri(s)
}

fn is_uri_reference(s: &str) -> bool {
    s.is_ascii() && is_iri_reference(s)
}

fn is_iri(s: &str) -> bool {
    !has_illegal_uri_chars(s) && Url::parse(s).is_ok()
}

fn is_iri_reference(s: &str) -> bool {
    !has_illegal_uri_chars(s) && (Url::parse(s).is_ok() || REFERENCE_BASE.join(s).is_ok())
}

fn is_uri_template(s: &str) -> bool {
    let mut open = false;
    for c in s.chars() {
        match c {
            '{' if open => return false,
            '{' => open = true,
            '}' if !open => return false,
            '}' => open = false,
            _ => {}
        }
    }
    !open
}

#[cfg(feature = "formats")]
fn is_uuid(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 36
        && [8, 13, 18, 23].iter().all(|&i| b[i] == b'-')
        && uuid::Uuid::parse_str(s).is_ok()
}

fn is_regex(s: &str) -> bool {
    crate::ecma::compile(s).is_ok()
}

fn is_json_pointer(s: &str) -> bool {
    pointer::parse(s).is_some()
}

fn is_relative_json_pointer(s: &str) -> bool {
    let len = s.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 || (len > 1 && s.starts_with('0')) {
        return false;
    }
    let rest = &s[len..];
    rest == "#" || pointer::parse(rest).is_some()
}

/// Whether `s` is valid under `contentEncoding`. Unknown encodings pass.
pub fn check_encoding(encoding: &str, s: &str) -> bool {
    match encoding.to_ascii_lowercase().as_str() {
        #[cfg(feature = "formats")]
        "base64" => data_encoding::BASE64.decode(s.as_bytes()).is_ok(),
        _ => true,
    }
}

/// Whether `s`, decoded with `encoding`, is valid under `contentMediaType`.
///
/// Only JSON media types are checked. Content that cannot be decoded passes here; the
/// encoding check reports it.
pub fn check_media_type(media_type: &str, encoding: Option<&str>, s: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if essence != "application/json" && !essence.ends_with("+json") {
        return true;
    }
    let Some(bytes) = decode(encoding, s) else {
        return true;
    };
    serde_json::from_slice::<Value>(&bytes).is_ok()
}

fn decode(encoding: Option<&str>, s: &str) -> Option<Vec<u8>> {
    match encoding.map(str::to_ascii_lowercase).as_deref() {
        None => Some(s.as_bytes().to_vec()),
        #[cfg(feature = "formats")]
        Some("base64") => data_encoding::BASE64.decode(s.as_bytes()).ok(),
        Some(_) => None,
    }
}
