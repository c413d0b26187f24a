//! Common regex patterns for CDS report text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Number tokens
    pub static ref NUMBER_TOKEN: Regex = Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap();

    pub static ref CURRENCY_TOKEN: Regex = Regex::new(r"\$\s*(\d[\d,]*(?:\.\d+)?)").unwrap();

    pub static ref PERCENT_TOKEN: Regex = Regex::new(r"\d+(?:\.\d+)?\s*%").unwrap();

    // Text normalization
    pub static ref SPACE_BEFORE_COMMA: Regex = Regex::new(r"(\d)[ \t]+,").unwrap();

    pub static ref SPLIT_THOUSANDS: Regex = Regex::new(r"(^|[^\d,])(\d{1,2}) (\d,\d{3})").unwrap();

    // Era markers
    pub static ref MODERN_MARKER: Regex = Regex::new(
        r"(?i)students who applied in fall\s+\d{4}|another gender"
    ).unwrap();

    // C1: gendered funnel lines (legacy wording)
    pub static ref MEN_APPLIED: Regex = Regex::new(r"(?i)\bmen who applied\b").unwrap();
    pub static ref WOMEN_APPLIED: Regex = Regex::new(r"(?i)\bwomen who applied\b").unwrap();
    pub static ref MEN_ADMITTED: Regex = Regex::new(r"(?i)\bmen who were admitted\b").unwrap();
    pub static ref WOMEN_ADMITTED: Regex = Regex::new(r"(?i)\bwomen who were admitted\b").unwrap();
    pub static ref MEN_ENROLLED: Regex = Regex::new(r"(?i)\bmen who enrolled\b").unwrap();
    pub static ref WOMEN_ENROLLED: Regex = Regex::new(r"(?i)\bwomen who enrolled\b").unwrap();

    pub static ref FULL_TIME: Regex = Regex::new(r"(?i)\bfull-time\b").unwrap();
    pub static ref PART_TIME: Regex = Regex::new(r"(?i)\bpart-time\b").unwrap();

    // C1: combined funnel lines (modern wording)
    pub static ref STUDENTS_APPLIED: Regex = Regex::new(
        r"(?i)\bstudents who applied in fall\s+\d{4}"
    ).unwrap();
    pub static ref STUDENTS_ADMITTED: Regex = Regex::new(
        r"(?i)\bstudents (?:who were )?admitted in fall\s+\d{4}"
    ).unwrap();
    pub static ref STUDENTS_ENROLLED: Regex = Regex::new(
        r"(?i)\bstudents (?:who )?enrolled in fall\s+\d{4}"
    ).unwrap();

    // C1: total lines without a gender split
    pub static ref TOTAL_APPLIED: Regex = Regex::new(
        r"(?i)\(degree-seeking\)\s+(?:students\s+)?who applied\b"
    ).unwrap();
    pub static ref TOTAL_ADMITTED: Regex = Regex::new(
        r"(?i)\(degree-seeking\)\s+(?:students\s+)?who were admitted\b"
    ).unwrap();
    pub static ref TOTAL_ENROLLED: Regex = Regex::new(
        r"(?i)\(degree-seeking\)\s+(?:students\s+)?who enrolled\b"
    ).unwrap();

    // C21, C22: early plans
    pub static ref ED_RECEIVED: Regex = Regex::new(
        r"(?i)early decision applications received\D{0,40}?(\d[\d,]*)"
    ).unwrap();
    pub static ref ED_ADMITTED: Regex = Regex::new(
        r"(?i)admitted under early decision plan\D{0,40}?(\d[\d,]*)"
    ).unwrap();
    pub static ref EA_RECEIVED: Regex = Regex::new(
        r"(?i)early action applications received\D{0,40}?(\d[\d,]*)"
    ).unwrap();
    pub static ref EA_ADMITTED: Regex = Regex::new(
        r"(?i)admitted under early action plan\D{0,40}?(\d[\d,]*)"
    ).unwrap();

    // C9: test score labels
    pub static ref SAT_COMPOSITE: Regex = Regex::new(r"(?i)\bSAT composite\b").unwrap();
    pub static ref SAT_EBRW: Regex = Regex::new(
        r"(?i)\bSAT (?:evidence-based reading and writing|EBRW)\b"
    ).unwrap();
    pub static ref SAT_CRITICAL_READING: Regex = Regex::new(r"(?i)\bSAT critical reading\b").unwrap();
    pub static ref SAT_MATH: Regex = Regex::new(r"(?i)\bSAT math\b").unwrap();
    pub static ref ACT_COMPOSITE: Regex = Regex::new(r"(?i)\bACT composite\b").unwrap();

    pub static ref SCALE_LABEL: Regex = Regex::new(r"\(\s*\d+\s*[-–]\s*\d+\s*\)").unwrap();
    pub static ref SCORE_TOKEN: Regex = Regex::new(r"\b\d{1,4}\b").unwrap();

    pub static ref SAT_SUBMITTING: Regex = Regex::new(
        r"(?i)percent submitting SAT scores\s*(\d+(?:\.\d+)?\s*%?)"
    ).unwrap();
    pub static ref ACT_SUBMITTING: Regex = Regex::new(
        r"(?i)percent submitting ACT scores\s*(\d+(?:\.\d+)?\s*%?)"
    ).unwrap();

    // B1: enrollment totals
    pub static ref TOTAL_UNDERGRADUATES: Regex = Regex::new(r"(?i)\btotal all undergraduates?\b").unwrap();
    pub static ref TOTAL_UNDERGRADUATE_ENROLLMENT: Regex = Regex::new(
        r"(?i)\btotal (?:degree-seeking )?undergraduate (?:enrollment|students)\b"
    ).unwrap();
    pub static ref TOTAL_GRADUATE: Regex = Regex::new(
        r"(?i)\btotal all graduate and professional students\b"
    ).unwrap();
    pub static ref GRAND_TOTAL: Regex = Regex::new(r"(?i)\bgrand total all students\b").unwrap();

    // B2: race/ethnicity section
    pub static ref B2_START: Regex = Regex::new(r"(?im)^\s*B2\b.*(?:racial|ethnic|race)").unwrap();
    pub static ref B2_END: Regex = Regex::new(r"(?m)^\s*B[34]\b").unwrap();
    pub static ref NON_HISPANIC: Regex = Regex::new(r"(?i),?\s*non-hispanic").unwrap();

    // F1: residency
    pub static ref OUT_OF_STATE: Regex = Regex::new(
        r"(?i)percent who (?:are|were) from out of state(?:\s*\([^)]*\))?[^\d%]{0,60}((?:\d+(?:\.\d+)?\s*%\s*)+)"
    ).unwrap();

    // G1: costs, matched against joined text
    pub static ref TUITION_COLON: Regex = Regex::new(
        r"(?i)\btuition:\s*\$?\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();
    pub static ref TUITION_DOLLAR: Regex = Regex::new(
        r"(?i)\btuition[\s:]+\$\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();
    pub static ref FEES_COLON: Regex = Regex::new(
        r"(?i)\brequired fees:\s*\$?\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();
    pub static ref FEES_DOLLAR: Regex = Regex::new(
        r"(?i)\brequired fees[\s:]+\$\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();
    pub static ref FOOD_HOUSING_ON_CAMPUS: Regex = Regex::new(
        r"(?i)\bfood and housing\s*\(on-campus\):?\s*\$?\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();
    pub static ref FOOD_HOUSING: Regex = Regex::new(
        r"(?i)\bfood and housing[\s:]+\$\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();
    pub static ref ROOM_BOARD_ON_CAMPUS: Regex = Regex::new(
        r"(?i)\broom and board:?\s*\(on-campus\):?\s*\$?\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();
    pub static ref ROOM_BOARD: Regex = Regex::new(
        r"(?i)\broom and board[\s:]+\$\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();

    // H2: financial aid, matched against joined text
    pub static ref AID_PACKAGE: Regex = Regex::new(
        r"(?i)average financial aid package[^$]{0,200}\$\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();
    pub static ref H2J_ROW: Regex = Regex::new(
        r"(?i)\bH2\s*j\b[^$]{0,200}\$\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();
    pub static ref NEED_BASED_GRANT: Regex = Regex::new(
        r"(?i)average need-based scholarship (?:and|or) grant award[^$]{0,200}\$\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();
    pub static ref H2K_ROW: Regex = Regex::new(
        r"(?i)\bH2\s*k\b[^$]{0,200}\$\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();
    pub static ref H2_JK_PAIR: Regex = Regex::new(
        r"(?i)\bj\)[^$]{0,300}?\$\s*(\d[\d,]*(?:\.\d+)?).{0,300}?\bk\)[^$]{0,300}?\$\s*(\d[\d,]*(?:\.\d+)?)"
    ).unwrap();
    pub static ref NEED_MET: Regex = Regex::new(
        r"(?i)percentage of need that was met[^%]{0,400}?(\d+(?:\.\d+)?\s*%)"
    ).unwrap();
    pub static ref NEED_FULLY_MET: Regex = Regex::new(
        r"(?i)need fully met[^%]{0,200}?(\d+(?:\.\d+)?\s*%)"
    ).unwrap();
    pub static ref RECEIVING_AID: Regex = Regex::new(
        r"(?i)receiving need-based (?:financial )?aid[^%]{0,200}?(\d+(?:\.\d+)?\s*%)"
    ).unwrap();

    // Academic-year labels in file names
    pub static ref YEAR_FULL_RANGE: Regex = Regex::new(r"(\d{4})[-_](\d{4})").unwrap();
    pub static ref YEAR_SHORT_END: Regex = Regex::new(r"(\d{4})[-_](\d{2})\b").unwrap();
    pub static ref YEAR_SHORT_RANGE: Regex = Regex::new(r"\b(\d{2})[-_](\d{2})\b").unwrap();
    pub static ref YEAR_SINGLE: Regex = Regex::new(r"(\d{4})").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_men_pattern_skips_women() {
        assert!(!MEN_APPLIED.is_match("Total first-time, first-year women who applied 12,300"));
        assert!(MEN_APPLIED.is_match("Total first-time, first-year men who applied 11,200"));
    }

    #[test]
    fn test_total_applied_skips_gendered_lines() {
        assert!(!TOTAL_APPLIED.is_match("(degree-seeking) men who applied 11,200"));
        assert!(TOTAL_APPLIED.is_match("Total first-time, first-year (degree-seeking) who applied 23,500"));
    }

    #[test]
    fn test_out_of_state_captures_percent_run() {
        let text = "Percent who are from out of state (exclude international/nonresident aliens from the numerator and denominator) 61% 58%";
        let caps = OUT_OF_STATE.captures(text).unwrap();
        assert_eq!(caps[1].trim(), "61% 58%");
    }

    #[test]
    fn test_split_thousands_pattern() {
        let repaired = SPLIT_THOUSANDS.replace_all("applied 1 2,345", "${1}${2}${3}");
        assert_eq!(repaired, "applied 12,345");
    }
}
