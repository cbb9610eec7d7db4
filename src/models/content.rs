use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentSection {
    pub title: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SocialLinks {
    #[serde(default)]
    pub youtube: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// `/web/public_content`: a club's landing page copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebPublicContent {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub subline: String,
    #[serde(default)]
    pub sections: Vec<ContentSection>,
    #[serde(default)]
    pub social: Option<SocialLinks>,
}

/// Cache-busting suffix for club artwork.
const ASSET_VERSION: &str = "20240517";

impl WebPublicContent {
    pub fn logo_url(&self, asset_base: &str) -> String {
        format!(
            "{}/clubs/{}/logo.png?v={}",
            asset_base.trim_end_matches('/'),
            self.slug,
            ASSET_VERSION
        )
    }

    pub fn hero_url(&self, asset_base: &str) -> String {
        format!(
            "{}/clubs/{}/hero.jpg?v={}",
            asset_base.trim_end_matches('/'),
            self.slug,
            ASSET_VERSION
        )
    }
}

pub fn fallback_logo_url(asset_base: &str) -> String {
    format!("{}/clubs/defaults/logo.png", asset_base.trim_end_matches('/'))
}

pub fn fallback_hero_url(asset_base: &str) -> String {
    format!("{}/clubs/defaults/hero.jpg", asset_base.trim_end_matches('/'))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i32>,
}

impl FaqItem {
    /// Answer split on blank lines, each paragraph HTML-escaped.
    pub fn paragraphs(&self) -> Vec<String> {
        split_paragraphs(&self.answer)
            .into_iter()
            .map(|p| html_escape::encode_text(p).into_owned())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaqCategory {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i32>,
    #[serde(default)]
    pub items: Vec<FaqItem>,
}

/// `/web/faq`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WebFaq {
    #[serde(default)]
    pub categories: Vec<FaqCategory>,
}

impl WebFaq {
    /// Orders categories and items by `sequence`; unsequenced entries keep
    /// their relative order after the sequenced ones.
    pub fn sorted(mut self) -> Self {
        self.categories
            .sort_by_key(|c| c.sequence.unwrap_or(i32::MAX));
        for category in &mut self.categories {
            category
                .items
                .sort_by_key(|i| i.sequence.unwrap_or(i32::MAX));
        }
        self
    }

    /// Drops blank questions and empty categories before saving.
    pub fn validated(mut self) -> Result<Self, String> {
        for category in &mut self.categories {
            category.title = category.title.trim().to_string();
            category
                .items
                .retain(|i| !i.question.trim().is_empty() || !i.answer.trim().is_empty());
            for item in &category.items {
                if item.question.trim().is_empty() {
                    return Err(format!(
                        "A question in \"{}\" has an answer but no question text",
                        category.title
                    ));
                }
            }
        }
        self.categories
            .retain(|c| !c.title.is_empty() || !c.items.is_empty());
        if self.categories.iter().any(|c| c.title.is_empty()) {
            return Err("Every category needs a title".to_string());
        }
        Ok(self)
    }
}

/// Splits text into paragraphs on blank lines (lines holding only whitespace
/// count as blank).
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    let text = text.trim();
    let mut out = Vec::new();
    let mut start = 0;
    let mut blank_run_start: Option<usize> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let is_blank = line.trim().is_empty();
        match (is_blank, blank_run_start) {
            (true, None) => blank_run_start = Some(offset),
            (false, Some(run_start)) => {
                let para = text[start..run_start].trim();
                if !para.is_empty() {
                    out.push(para);
                }
                start = offset;
                blank_run_start = None;
            }
            _ => {}
        }
        offset += line.len();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}
