pub const INSIGHT_ROLE: &str = "You are a research analyst writing in UK English.";

pub const POST_ROLE: &str =
    "You are a marketing specialist writing LinkedIn posts in UK English.";

pub const DEFAULT_IMAGE_PROMPT: &str =
    "Create a clean, professional illustration for a LinkedIn post. \
     Avoid any text in the image. The post reads:\n{post}";

/// Placeholder in image prompt templates replaced by the generated post.
pub const POST_PLACEHOLDER: &str = "{post}";

pub const EMAIL_SUBJECT: &str = "Feedly Insights";

pub fn insight_preamble(article_count: usize) -> String {
    format!(
        "Extract the key insights & trends from these {article_count} articles \
         and highlight any resources worth checking:\n"
    )
}

pub fn post_context(source_count: usize, from_insights: bool) -> String {
    if from_insights {
        format!(
            "Generate a LinkedIn post including the links to the relevant articles \
             from these {source_count} insight summaries:\n"
        )
    } else {
        format!(
            "Extract insights and generate a LinkedIn post including the links to the \
             relevant articles from these {source_count} articles:\n"
        )
    }
}

pub const POST_HOUSE_STYLE: &str = "\nYou should only talk about the insights extracted from these \
articles with a bias towards process automation, and there shouldn't be more than 2 articles \
linked to in the post.\
\nMake sure to include the actual URL to the articles.";

/// Assembles the single post-generation prompt.
///
/// An override replaces both the context line and the house style.
pub fn post_prompt(
    source: &str,
    source_count: usize,
    from_insights: bool,
    override_body: Option<&str>,
) -> String {
    match override_body.map(str::trim).filter(|s| !s.is_empty()) {
        Some(body) => format!("{body}\n{source}"),
        None => format!(
            "{}{source}{POST_HOUSE_STYLE}",
            post_context(source_count, from_insights)
        ),
    }
}

pub fn image_prompt(template: Option<&str>, post: &str) -> String {
    let template = template
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_IMAGE_PROMPT);
    if template.contains(POST_PLACEHOLDER) {
        template.replace(POST_PLACEHOLDER, post)
    } else {
        format!("{template}\n{post}")
    }
}
