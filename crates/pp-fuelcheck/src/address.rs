//! Station address handling.
//!
//! Upstream addresses look like `"1 George St, SYDNEY NSW 2000"`. They are
//! split on `,`, `" NSW "` and `" ACT "`, keeping the delimiters, so the
//! pieces line up as `[street, ",", suburb, state, postcode]`.

const DELIMITERS: [&str; 3] = [",", " NSW ", " ACT "];

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AddressParts {
    pub street: String,
    pub suburb: String,
    pub state: String,
    pub postcode: Option<u32>,
}

/// Split `s` at every delimiter occurrence, keeping the delimiters as their
/// own pieces. Leftmost match wins; ties go to the first listed delimiter.
fn split_keeping_delimiters<'a>(s: &'a str, delimiters: &[&str]) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut rest = s;
    loop {
        let next = delimiters
            .iter()
            .filter_map(|d| rest.find(d).map(|i| (i, *d)))
            .min_by_key(|(i, _)| *i);
        match next {
            Some((i, d)) => {
                out.push(&rest[..i]);
                out.push(&rest[i..i + d.len()]);
                rest = &rest[i + d.len()..];
            }
            None => {
                out.push(rest);
                return out;
            }
        }
    }
}

pub fn split_address(address: &str) -> AddressParts {
    let pieces: Vec<&str> = split_keeping_delimiters(address, &DELIMITERS)
        .into_iter()
        .map(str::trim)
        .collect();
    let piece = |i: usize| pieces.get(i).map(|p| p.to_string()).unwrap_or_default();

    AddressParts {
        street: piece(0),
        suburb: piece(2),
        state: piece(3),
        postcode: pieces.get(4).and_then(|p| p.parse::<u32>().ok()),
    }
}
