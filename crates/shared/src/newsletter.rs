use chrono::{DateTime, Utc};

use crate::models::{Digest, Entry, Section};

pub struct NewsletterRenderer;

impl NewsletterRenderer {
    fn format_date(date: DateTime<Utc>) -> String {
        // "October 12, 2026"
        date.format("%B %d, %Y").to_string()
    }

    pub fn generate(digest: &Digest, subject: &str, date: DateTime<Utc>) -> String {
        let mut html = String::new();
        let issue_date = Self::format_date(date);

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("  <meta charset=\"UTF-8\">\n");
        html.push_str(&format!(
            "  <title>{}</title>\n",
            Self::escape_html(subject)
        ));
        html.push_str("  <style>\n");
        html.push_str("    body { font-family: Arial, sans-serif; max-width: 640px; margin: 0 auto; padding: 20px; line-height: 1.6; color: #2c3e50; }\n");
        html.push_str("    h1 { text-align: center; border-bottom: 3px solid #3498db; padding-bottom: 10px; }\n");
        html.push_str("    h1 .date { display: block; font-size: 0.6em; font-weight: normal; color: #555; }\n");
        html.push_str("    h2 { margin: 30px 0 10px 0; padding: 8px 10px; background-color: #ecf0f1; border-left: 4px solid #3498db; }\n");
        html.push_str("    .entry { margin: 12px 0; }\n");
        html.push_str("    .entry a { color: #3498db; text-decoration: none; font-weight: bold; }\n");
        html.push_str("    .meta { color: #7f8c8d; font-size: 0.9em; }\n");
        html.push_str("    blockquote { font-style: italic; margin: 10px 20px; }\n");
        html.push_str("  </style>\n");
        html.push_str("</head>\n<body>\n");

        html.push_str(&format!(
            "<h1>AI Weekly<span class=\"date\">{}</span></h1>\n",
            issue_date
        ));

        for (section, entries) in digest.sections() {
            if entries.is_empty() {
                continue;
            }

            html.push_str(&format!(
                "<h2>{}</h2>\n",
                Self::escape_html(section.title())
            ));

            for entry in entries {
                Self::render_entry(&mut html, section, entry);
            }
        }

        html.push_str("<hr>\n");
        html.push_str("<p class=\"meta\" style=\"text-align: center;\">You are receiving this because you subscribed to AI Weekly.</p>\n");
        html.push_str("</body>\n</html>");
        html
    }

    fn render_entry(html: &mut String, section: Section, entry: &Entry) {
        html.push_str("<div class=\"entry\">\n");
        match entry {
            Entry::Item(item) => {
                html.push_str(&format!(
                    "  <a href=\"{}\">{}</a>\n",
                    Self::escape_html(&item.url),
                    Self::escape_html(&item.title)
                ));
                if section == Section::GithubRepo {
                    if let Some(stars) = item.engagement {
                        html.push_str(&format!("  <span class=\"meta\">★ {}</span>\n", stars));
                    }
                }
                if !item.summary.is_empty() {
                    html.push_str(&format!(
                        "  <p>{}</p>\n",
                        Self::escape_html(&item.summary)
                    ));
                }
            }
            Entry::Job(job) => {
                html.push_str(&format!(
                    "  <a href=\"{}\">{}</a>\n",
                    Self::escape_html(&job.url),
                    Self::escape_html(&job.role)
                ));
                html.push_str(&format!(
                    "  <div class=\"meta\">{}</div>\n",
                    Self::escape_html(&job.employer)
                ));
            }
            Entry::Quote(quote) => {
                html.push_str(&format!(
                    "  <blockquote>&ldquo;{}&rdquo;</blockquote>\n  <div class=\"meta\">&mdash; {}</div>\n",
                    Self::escape_html(&quote.quote),
                    Self::escape_html(&quote.author)
                ));
            }
        }
        html.push_str("</div>\n");
    }

    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }
}
