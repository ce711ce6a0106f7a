//! Deterministic synthetic complaint generation for demos and load runs

use crate::case::Case;

pub const BASE_TEXTS: [&str; 5] = [
    "I see an unauthorized charge on my debit card that I did not make yesterday.",
    "Locked out of my online banking account after multiple password attempts.",
    "I was charged a fee I was not told about on my credit card.",
    "Payment processing delay caused my mortgage payment to show late.",
    "Potential fraud noticed in my recent transactions, please help.",
];

pub const CHANNELS: [&str; 3] = ["web_form", "email", "chat"];

const NOISE: &str = " There were also other strange activities.";

/// Case id for the `index`-th synthetic case
pub fn synthetic_case_id(index: usize) -> String {
    format!("C_SYN_{index:04}")
}

/// Generate `count` cases.
///
/// Texts cycle through [`BASE_TEXTS`], channels through [`CHANNELS`], and
/// three cases in every ten carry trailing noise. The same `count` always
/// yields the same cases apart from timestamps.
pub fn generate_cases(count: usize) -> Vec<Case> {
    (0..count)
        .map(|i| {
            let base = BASE_TEXTS[i % BASE_TEXTS.len()];
            let text = if i % 10 >= 7 {
                format!("{base}{NOISE}")
            } else {
                base.to_string()
            };
            Case::new(synthetic_case_id(i), text, CHANNELS[i % CHANNELS.len()]).with_language("en")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::CaseState;

    #[test]
    fn test_ids_and_channels() {
        let cases = generate_cases(4);

        let ids: Vec<&str> = cases.iter().map(|c| c.case_id.as_str()).collect();
        assert_eq!(ids, vec!["C_SYN_0000", "C_SYN_0001", "C_SYN_0002", "C_SYN_0003"]);

        let channels: Vec<&str> = cases.iter().map(|c| c.channel.as_str()).collect();
        assert_eq!(channels, vec!["web_form", "email", "chat", "web_form"]);
        assert!(cases.iter().all(|c| c.state == CaseState::Received));
    }

    #[test]
    fn test_noise_pattern() {
        let cases = generate_cases(10);
        let noisy: Vec<usize> = cases
            .iter()
            .enumerate()
            .filter(|(_, c)| c.raw_text.ends_with(NOISE))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(noisy, vec![7, 8, 9]);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let first: Vec<String> = generate_cases(12).into_iter().map(|c| c.raw_text).collect();
        let second: Vec<String> = generate_cases(12).into_iter().map(|c| c.raw_text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_count() {
        assert!(generate_cases(0).is_empty());
    }
}
