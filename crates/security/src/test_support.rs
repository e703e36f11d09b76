//! Small entity decoder for unit tests that do not pull in a full HTML parser.

use crate::normalizer::EntityDecoder;

/// Decodes numeric references and a handful of named ones. Only
/// `;`-terminated references are recognized.
pub(crate) struct ReferenceDecoder;

const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("colon", ':'),
    ("Tab", '\t'),
    ("NewLine", '\n'),
    ("sol", '/'),
    ("lpar", '('),
    ("rpar", ')'),
    ("nbsp", '\u{00A0}'),
];

impl EntityDecoder for ReferenceDecoder {
    fn unescape_entities(&self, input: &str, _strict: bool) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(amp) = rest.find('&') {
            out.push_str(&rest[..amp]);
            let tail = &rest[amp + 1..];
            match tail.find(';').and_then(|semi| decode(&tail[..semi]).map(|c| (semi, c))) {
                Some((semi, c)) => {
                    out.push(c);
                    rest = &tail[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = tail;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn decode(name: &str) -> Option<char> {
    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = name.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32);
    }
    NAMED.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
}
