//! Tokenization shared by documents and queries.
//!
//! # Algorithm
//!
//! 1. Lower-case the input.
//! 2. Split into maximal runs of word characters (alphanumeric or `_`).
//! 3. Drop runs shorter than two characters.
//! 4. Drop English stop words.
//! 5. Emit every remaining token (unigram) followed by every pair of
//!    adjacent remaining tokens joined by a space (bigram).
//!
//! Bigrams are formed after stop-word removal, so `"pricing for plans"`
//! yields the bigram `"pricing plans"`.

/// English stop words, sorted for binary search.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here", "hereafter",
    "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his", "how", "however",
    "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into", "is", "it", "its",
    "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd", "made", "many", "may",
    "me", "meanwhile", "might", "mill", "mine", "more", "moreover", "most", "mostly", "move",
    "much", "must", "my", "myself", "name", "namely", "neither", "never", "nevertheless", "next",
    "nine", "no", "nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of",
    "off", "often", "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise",
    "our", "ours", "ourselves", "out", "over", "own", "part", "per", "perhaps", "please", "put",
    "rather", "re", "same", "see", "seem", "seemed", "seeming", "seems", "serious", "several",
    "she", "should", "show", "side", "since", "sincere", "six", "sixty", "so", "some", "somehow",
    "someone", "something", "sometime", "sometimes", "somewhere", "still", "such", "system",
    "take", "ten", "than", "that", "the", "their", "them", "themselves", "then", "thence",
    "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they",
    "thick", "thin", "third", "this", "those", "though", "three", "through", "throughout", "thru",
    "thus", "to", "together", "too", "top", "toward", "towards", "twelve", "twenty", "two", "un",
    "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were", "what",
    "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas", "whereby",
    "wherein", "whereupon", "wherever", "whether", "which", "while", "whither", "who", "whoever",
    "whole", "whom", "whose", "why", "will", "with", "within", "without", "would", "yet", "you",
    "your", "yours", "yourself", "yourselves",
];

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// Split lower-cased text into word tokens of two or more characters,
/// with stop words removed.
pub fn words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .filter(|t| !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

/// Produce the unigram and bigram terms of `text`.
pub fn terms(text: &str) -> Vec<String> {
    let words = words(text);
    let mut out = Vec::with_capacity(words.len() * 2);
    out.extend(words.iter().cloned());
    out.extend(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_words_sorted() {
        assert!(STOP_WORDS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_words_drops_stop_words_and_short_tokens() {
        assert_eq!(
            words("What are your Pricing Plans? a b"),
            vec!["pricing", "plans"]
        );
    }

    #[test]
    fn test_words_splits_on_punctuation() {
        assert_eq!(
            words("X-RateLimit-Remaining, $49/mo"),
            vec!["ratelimit", "remaining", "49", "mo"]
        );
    }

    #[test]
    fn test_terms_include_bigrams_across_removed_stop_words() {
        let t = terms("pricing for plans");
        assert_eq!(t, vec!["pricing", "plans", "pricing plans"]);
    }

    #[test]
    fn test_terms_empty_input() {
        assert!(terms("").is_empty());
        assert!(terms("how much is it").is_empty());
    }
}
