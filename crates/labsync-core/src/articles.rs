use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{slugify, ProductGroup};
use crate::ConfigError;

/// Byline used on articles rendered from product data.
pub const GENERATED_AUTHOR: &str = "Research Desk";
const GENERATED_READ_TIME: &str = "5 min read";

/// A hand-written article loaded from the articles YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub subheadline: Option<String>,
    pub category: String,
    pub author: String,
    pub published_on: NaiveDate,
    #[serde(default)]
    pub read_time: Option<String>,
    /// Markdown body.
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ArticlesFile {
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSections {
    pub introduction: String,
    pub chemical_background: String,
    pub laboratory_study_summary: String,
    pub handling_and_storage: String,
    pub conclusion: String,
}

impl ArticleSections {
    fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.introduction.as_str(),
            self.chemical_background.as_str(),
            self.laboratory_study_summary.as_str(),
            self.handling_and_storage.as_str(),
            self.conclusion.as_str(),
        ]
        .into_iter()
    }
}

/// An article rendered from a product group. Shares the group's slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArticle {
    pub slug: String,
    pub title: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
    pub category: String,
    pub author: String,
    pub published_on: NaiveDate,
    pub read_time: String,
    pub sections: ArticleSections,
    pub disclaimer: String,
}

impl GeneratedArticle {
    /// Lowercased body text used by search.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![&self.title, &self.meta_description, &self.category];
        parts.extend(self.keywords.iter().map(String::as_str));
        parts.extend(self.sections.iter());
        parts.join(" ").to_lowercase()
    }
}

impl Article {
    #[must_use]
    pub fn searchable_text(&self) -> String {
        [
            self.title.as_str(),
            self.description.as_str(),
            self.subheadline.as_deref().unwrap_or_default(),
            self.category.as_str(),
            self.content.as_str(),
        ]
        .join(" ")
        .to_lowercase()
    }
}

/// Render the informational article for one product group.
///
/// Output depends only on the group and `published_on`.
#[must_use]
pub fn generate_article(group: &ProductGroup, published_on: NaiveDate) -> GeneratedArticle {
    let name = group.base_name.as_str();
    let chem = &group.chemical;

    let mut keywords = vec![name.to_string()];
    keywords.extend(chem.synonyms.iter().cloned());
    keywords.push(group.category.clone());
    keywords.extend(
        ["peptide research", "laboratory research", "research compound"]
            .iter()
            .map(ToString::to_string),
    );
    if chem.formula.is_some() {
        keywords.push("chemical formula".to_string());
    }
    keywords.retain(|k| !k.trim().is_empty());

    let chemical_background = match chem.formula.as_deref() {
        Some(formula) => {
            let mut text = format!("The molecular formula of {name} is {formula}");
            if let Some(mass) = chem.molar_mass.as_deref() {
                text.push_str(&format!(", with a molar mass of {mass}"));
            }
            text.push('.');
            if let Some(cas) = chem.cas_number.as_deref() {
                text.push_str(&format!(" Its CAS registry number is {cas}."));
            }
            if !chem.synonyms.is_empty() {
                text.push_str(&format!(
                    " It is also referred to as {}.",
                    chem.synonyms.join(", ")
                ));
            }
            if let Some(cid) = chem.pubchem_id.as_deref() {
                text.push_str(&format!(" PubChem lists it under CID {cid}."));
            }
            text
        }
        None => format!(
            "{name} is supplied as a research compound. Structural and physical data \
             are listed on the product specification sheet and safety data sheet."
        ),
    };

    let laboratory_study_summary = group
        .research_applications
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "Laboratories use {name} to study cellular signalling, biochemical \
                 pathways and related experimental models under controlled conditions."
            )
        });

    let handling_and_storage = match (
        group.storage_requirements.as_deref(),
        group.handling_guidelines.as_deref(),
    ) {
        (Some(storage), Some(handling)) => {
            format!("**Storage:** {storage}\n\n**Handling:** {handling}")
        }
        _ => "**Storage:** Keep lyophilised powder at -20°C, dry and away from light. \
              Store reconstituted solution at 4°C and use within 14 days.\n\n\
              **Handling:** Work with sterile technique and suitable PPE in a \
              ventilated area. Avoid inhalation, ingestion and skin contact."
            .to_string(),
    };

    GeneratedArticle {
        slug: group.slug.clone(),
        title: format!("What Is {name}? Research Overview and Laboratory Use"),
        meta_description: format!(
            "An overview of {name} for laboratory researchers: chemical properties, \
             published research applications and handling guidance."
        ),
        keywords,
        category: group.category.clone(),
        author: GENERATED_AUTHOR.to_string(),
        published_on,
        read_time: GENERATED_READ_TIME.to_string(),
        sections: ArticleSections {
            introduction: format!(
                "{name} is a compound used in laboratory investigations. This overview \
                 covers its chemistry, where it appears in research and how to store it."
            ),
            chemical_background,
            laboratory_study_summary,
            handling_and_storage,
            conclusion: format!(
                "This summary of {name} is a starting point. Consult the full product \
                 documentation, safety data sheet and primary literature before \
                 designing experiments."
            ),
        },
        disclaimer: format!(
            "**Disclaimer:** For informational purposes only. {name} is sold strictly \
             for laboratory research use. Not for human or veterinary use. Not approved \
             by the FDA to diagnose, treat or prevent any condition."
        ),
    }
}

/// One generated article per distinct base name, in catalog order.
#[must_use]
pub fn generate_all(groups: &[ProductGroup], published_on: NaiveDate) -> Vec<GeneratedArticle> {
    let mut seen = HashSet::new();
    groups
        .iter()
        .filter(|g| seen.insert(g.base_name.clone()))
        .map(|g| generate_article(g, published_on))
        .collect()
}

/// Load and validate hand-authored articles. A missing file yields none.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// fails validation.
pub fn load_articles(path: &Path) -> Result<Vec<Article>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ConfigError::ArticlesFileIo {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    let file: ArticlesFile = serde_yaml::from_str(&content)?;
    validate_articles(&file.articles)?;
    Ok(file.articles)
}

fn validate_articles(articles: &[Article]) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();

    for article in articles {
        if article.title.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "article '{}' has an empty title",
                article.slug
            )));
        }

        if article.slug.is_empty() || slugify(&article.slug) != article.slug {
            return Err(ConfigError::Validation(format!(
                "article slug '{}' must be lowercase alphanumerics separated by dashes",
                article.slug
            )));
        }

        if !seen_slugs.insert(article.slug.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate article slug: '{}'",
                article.slug
            )));
        }
    }

    Ok(())
}
