/// Display strings for one build of the popup.
#[derive(Debug, PartialEq, Eq)]
pub struct Locale {
    pub none_marker: &'static str,
    pub no_data: &'static str,
    pub wrong_page: &'static str,
    pub grades: &'static str,
    pub average: &'static str,
    pub no_average: &'static str,
    pub overall: &'static str,
    pub select_prompt: &'static str,
    pub error: &'static str,
}

pub const ENGLISH: Locale = Locale {
    none_marker: "None",
    no_data: "No grade data found on this page.",
    wrong_page: "Please navigate to the Mykoob grades page to use this extension.",
    grades: "Grades",
    average: "Average",
    no_average: "No grades",
    overall: "Overall Average",
    select_prompt: "Select at least one subject with grades",
    error: "Error",
};

pub const LATVIAN: Locale = Locale {
    none_marker: "Nav",
    no_data: "Nav atzīmju dati.",
    wrong_page: "Ejiet uz mykoob atzīmju sadaļu.",
    grades: "Atzīmes",
    average: "Vidējais",
    no_average: "Vidējais: Nav",
    overall: "Vidējais visos priekšmetos",
    select_prompt: "Izvēaties vismaz vienu priekšmetu",
    error: "Error",
};

impl Locale {
    /// The locale compiled into this build (`latvian` feature).
    pub const fn build() -> &'static Locale {
        if cfg!(feature = "latvian") {
            &LATVIAN
        } else {
            &ENGLISH
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "latvian"))]
    #[test]
    fn test_default_build_is_english() {
        assert_eq!(Locale::build(), &ENGLISH);
    }

    // Runs under `cargo test --features latvian`.
    #[cfg(feature = "latvian")]
    #[test]
    fn test_latvian_build_uses_latvian_strings() {
        assert_eq!(Locale::build(), &LATVIAN);
        assert_eq!(Locale::build().none_marker, "Nav");
    }

    #[test]
    fn test_tables_differ_only_where_translated() {
        assert_ne!(ENGLISH.wrong_page, LATVIAN.wrong_page);
        assert_eq!(ENGLISH.error, LATVIAN.error);
    }
}
