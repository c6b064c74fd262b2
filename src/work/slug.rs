//! Deterministic event slug
//!
//! Any two participants describing "the same job" must converge on the same
//! slug, because the shared slug is the only thing binding their
//! independently-owned records into one logical event. The slug is derived
//! from the job title and date range: title words are ASCII-folded,
//! lowercased, stripped of non-alphanumerics, and joined with hyphens, then
//! the start and end dates are appended.

use chrono::NaiveDate;

/// Compute the event slug for a job
pub fn event_slug(title: &str, from: NaiveDate, to: NaiveDate) -> String {
    let mut words: Vec<String> = Vec::new();
    for raw in title.split_whitespace() {
        let mut word = String::with_capacity(raw.len());
        for c in raw.to_lowercase().chars() {
            let folded = fold_ascii(c);
            if folded.is_ascii_alphanumeric() {
                word.push(folded);
            }
            // Punctuation and unfoldable characters do not survive
        }
        if !word.is_empty() {
            words.push(word);
        }
    }
    format!(
        "{}-{}-{}",
        words.join("-"),
        from.format("%Y%m%d"),
        to.format("%Y%m%d")
    )
}

/// Fold common Latin-1 letters to their ASCII base. Input is already
/// lowercased; anything unhandled passes through and is dropped by the
/// alphanumeric check above.
fn fold_ascii(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'ñ' | 'ń' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' => 'u',
        'ý' | 'ÿ' => 'y',
        'ž' | 'ź' | 'ż' => 'z',
        'š' | 'ś' => 's',
        other => other,
    }
}
