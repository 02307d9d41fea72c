use scraper::{Html, Selector};

/// Title, visible text, and anchor targets pulled out of one HTML page.
#[derive(Debug, Default)]
pub struct ExtractedPage {
    pub title: Option<String>,
    pub text: String,
    pub hrefs: Vec<String>,
}

pub fn extract(html: &str) -> ExtractedPage {
    let sel_title = Selector::parse("title").expect("valid selector");
    let sel_body = Selector::parse("body").expect("valid selector");
    let sel_a = Selector::parse("a").expect("valid selector");

    let doc = Html::parse_document(html);
    let title = doc
        .select(&sel_title)
        .next()
        .map(|n| collapse(n.text()))
        .filter(|t| !t.is_empty());
    let text = doc
        .select(&sel_body)
        .next()
        .map(|n| collapse(n.text()))
        .unwrap_or_default();
    let hrefs = doc
        .select(&sel_a)
        .filter_map(|a| a.value().attr("href"))
        .map(String::from)
        .collect();

    ExtractedPage { title, text, hrefs }
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_text_and_links() {
        let page = extract(
            "<html><head><title> A Page </title></head>\
             <body><p>alpha  beta</p><a href=\"/b\">b</a><a href=\"https://other/c\">c</a></body></html>",
        );
        assert_eq!(page.title.as_deref(), Some("A Page"));
        assert_eq!(page.text, "alpha beta b c");
        assert_eq!(page.hrefs, vec!["/b", "https://other/c"]);
    }

    #[test]
    fn missing_title_is_none() {
        let page = extract("<html><body>text only</body></html>");
        assert!(page.title.is_none());
        assert_eq!(page.text, "text only");
    }
}
