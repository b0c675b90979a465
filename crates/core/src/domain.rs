//! Content domains.

use serde::{Deserialize, Serialize};

/// A content category with its own criterion catalog and quality checks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Domain {
    /// Fiction, poetry and other creative prose
    CreativeWriting,
    /// Manuals, API references, how-to guides
    TechnicalDocumentation,
    /// Advertising and promotional copy
    MarketingCopy,
    /// News reporting
    NewsArticles,
    /// Scholarly writing
    AcademicPapers,
    /// Short-form social posts
    SocialMediaPosts,
    /// Any domain not known to this build
    Other(String),
}

impl Domain {
    /// All built-in domains, in display order.
    pub const KNOWN: [Domain; 6] = [
        Domain::CreativeWriting,
        Domain::TechnicalDocumentation,
        Domain::MarketingCopy,
        Domain::NewsArticles,
        Domain::AcademicPapers,
        Domain::SocialMediaPosts,
    ];

    /// The slug used in storage and reports.
    pub fn as_str(&self) -> &str {
        match self {
            Domain::CreativeWriting => "creative_writing",
            Domain::TechnicalDocumentation => "technical_documentation",
            Domain::MarketingCopy => "marketing_copy",
            Domain::NewsArticles => "news_articles",
            Domain::AcademicPapers => "academic_papers",
            Domain::SocialMediaPosts => "social_media_posts",
            Domain::Other(slug) => slug,
        }
    }

    /// Parse a slug. Unknown slugs become [`Domain::Other`].
    pub fn parse(slug: &str) -> Self {
        match slug.trim().to_lowercase().as_str() {
            "creative_writing" => Domain::CreativeWriting,
            "technical_documentation" => Domain::TechnicalDocumentation,
            "marketing_copy" => Domain::MarketingCopy,
            "news_articles" => Domain::NewsArticles,
            "academic_papers" => Domain::AcademicPapers,
            "social_media_posts" => Domain::SocialMediaPosts,
            other => Domain::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Domain {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for Domain {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Domain> for String {
    fn from(d: Domain) -> Self {
        d.as_str().to_string()
    }
}
