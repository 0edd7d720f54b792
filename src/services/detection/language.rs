// Summary Language Rules
// Georgian input gets a Georgian summary, everything else gets English, never mixed.

use regex::Regex;
use std::sync::OnceLock;

static GEORGIAN_LETTER: OnceLock<Regex> = OnceLock::new();
static LATIN_LETTER: OnceLock<Regex> = OnceLock::new();
static LATIN_ACRONYM: OnceLock<Regex> = OnceLock::new();

fn georgian_letter() -> &'static Regex {
    GEORGIAN_LETTER.get_or_init(|| Regex::new(r"\p{Georgian}").expect("valid script class"))
}

fn latin_letter() -> &'static Regex {
    LATIN_LETTER.get_or_init(|| Regex::new(r"\p{Latin}").expect("valid script class"))
}

// Standalone all-caps tokens such as AI, GPT or LLM
fn latin_acronym() -> &'static Regex {
    LATIN_ACRONYM.get_or_init(|| Regex::new(r"\b[A-Z]{2,4}\b").expect("valid acronym pattern"))
}

/// Which alphabet a piece of text is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Georgian,
    Latin,
    Mixed,
    /// No Georgian or Latin letters at all (digits, punctuation, other alphabets).
    Other,
}

pub fn classify_script(text: &str) -> Script {
    let georgian = georgian_letter().is_match(text);
    let latin = latin_letter().is_match(text);
    match (georgian, latin) {
        (true, true) => Script::Mixed,
        (true, false) => Script::Georgian,
        (false, true) => Script::Latin,
        (false, false) => Script::Other,
    }
}

pub fn contains_georgian(text: &str) -> bool {
    georgian_letter().is_match(text)
}

/// Language label as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageClass {
    Georgian,
    Unknown,
    Other,
}

pub fn classify_language(detected_language: &str) -> LanguageClass {
    let name = detected_language.trim().to_lowercase();
    if name.is_empty() || name == "unknown" || name == "undetermined" {
        LanguageClass::Unknown
    } else if name.contains("georgian") || name == "ka" || name == "kartuli" || contains_georgian(&name) {
        LanguageClass::Georgian
    } else {
        LanguageClass::Other
    }
}

/// Check a summary against the language rule. `Err` carries the reason.
///
/// An `Unknown` language accepts either pure script, since unreadable images
/// may be reported without a language.
///
/// Georgian summaries may quote short Latin acronyms (`AI`, `GPT`); any other
/// Latin word makes the summary mixed.
pub fn check_summary_script(detected_language: &str, summary: &str) -> Result<(), String> {
    let mut script = classify_script(summary);
    if script == Script::Mixed {
        let stripped = latin_acronym().replace_all(summary, "");
        script = classify_script(&stripped);
    }
    if script == Script::Mixed {
        return Err("analysis_summary mixes Georgian and Latin script".to_string());
    }

    match classify_language(detected_language) {
        LanguageClass::Georgian if script != Script::Georgian => Err(format!(
            "detected_language is {:?} but analysis_summary is not written in Georgian",
            detected_language
        )),
        LanguageClass::Other if script == Script::Georgian => Err(format!(
            "detected_language is {:?} but analysis_summary is written in Georgian",
            detected_language
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_script() {
        assert_eq!(classify_script("მოცემული ტექსტი ძალიან მოკლეა."), Script::Georgian);
        assert_eq!(classify_script("The text reads naturally."), Script::Latin);
        assert_eq!(classify_script("ტექსტი is AI"), Script::Mixed);
        assert_eq!(classify_script("42 %"), Script::Other);
        assert_eq!(classify_script("Текст написан человеком"), Script::Other);
    }

    #[test]
    fn test_classify_language() {
        assert_eq!(classify_language("Georgian"), LanguageClass::Georgian);
        assert_eq!(classify_language("ქართული"), LanguageClass::Georgian);
        assert_eq!(classify_language(" unknown "), LanguageClass::Unknown);
        assert_eq!(classify_language("English"), LanguageClass::Other);
        assert_eq!(classify_language("Russian"), LanguageClass::Other);
    }

    #[test]
    fn test_check_summary_script() {
        assert!(check_summary_script("Georgian", "მოცემული ტექსტი ძალიან მოკლეა საიმედო ანალიზისთვის.").is_ok());
        assert!(check_summary_script("English", "Uniform sentence structure suggests AI.").is_ok());
        assert!(check_summary_script("Russian", "The Russian text shows human irregularities.").is_ok());
        assert!(check_summary_script("Unknown", "The text in the image could not be reliably read for analysis.").is_ok());

        assert!(check_summary_script("Georgian", "This Georgian text looks human.").is_err());
        assert!(check_summary_script("English", "ტექსტი ადამიანის დაწერილია.").is_err());
        assert!(check_summary_script("Georgian", "ტექსტი ChatGPT-ის მსგავსია.").is_err());
    }

    #[test]
    fn test_georgian_summary_allows_acronyms() {
        assert!(check_summary_script("Georgian", "ტექსტი AI-ს მიერ არის შექმნილი.").is_ok());
        assert!(check_summary_script("Georgian", "სტრუქტურა GPT და LLM მოდელებს ჰგავს.").is_ok());

        // Lowercase or longer Latin words are still mixing
        assert!(check_summary_script("Georgian", "ტექსტი ai-ს მიერ არის შექმნილი.").is_err());
        assert!(check_summary_script("Georgian", "ტექსტი OPENAI-ს მსგავსია.").is_err());
        // Acronyms do not make an English summary Georgian
        assert!(check_summary_script("English", "ტექსტი AI-ს მიერ არის შექმნილი.").is_err());
    }
}
