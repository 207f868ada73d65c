use crate::models::RankedEntry;
use std::borrow::Cow;

const STYLE: &str = r#"
body {
    font-family: system-ui, sans-serif;
    max-width: 900px;
    margin: 40px auto;
    line-height: 1.5;
}
h1 {
    margin-bottom: 0;
    font-size: 1.7rem;
}
.small {
    color: #666;
    font-size: 0.9rem;
    margin-top: 0.2rem;
}
img {
    width: 100%;
    border: 1px solid #ccc;
    border-radius: 8px;
    margin-top: 20px;
}
table {
    width: 100%;
    border-collapse: collapse;
    margin-top: 24px;
    font-size: 0.9rem;
}
th, td {
    border: 1px solid #ccc;
    padding: 8px;
    text-align: left;
}
th {
    background: #f5f5f5;
}
"#;

/// 静态看板页面所需的数据
#[derive(Debug, Clone)]
pub struct DashboardPage<'a> {
    pub index: &'a str,
    pub source_name: &'a str,
    pub chart_file: &'a str,
    pub key_label: &'a str,
    pub value_label: &'a str,
    pub top_n: usize,
    pub generated_at: &'a str,
    pub entries: &'a [RankedEntry],
}

pub fn render_html(page: &DashboardPage<'_>) -> String {
    let heading = format!("Top {} by {}", page.top_n, page.value_label.to_lowercase());

    let rows: String = if page.entries.is_empty() {
        "        <tr><td colspan=\"3\">No data</td></tr>\n".to_string()
    } else {
        page.entries
            .iter()
            .enumerate()
            .map(|(rank, entry)| {
                format!(
                    "        <tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                    rank + 1,
                    escape(&entry.material),
                    entry.stock
                )
            })
            .collect()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8" />
<title>Inventory Dashboard</title>
<style>{style}</style>
</head>
<body>
    <h1>Inventory Dashboard</h1>
    <p class="small">Data from {source} loaded into Elasticsearch (index "{index}"). Generated {generated_at}.</p>

    <p>Pipeline:
    1) load the CSV into Elasticsearch,
    2) query Elasticsearch,
    3) generate this static page with the chart,
    4) publish it.</p>

    <img src="{chart}" alt="{heading}" />

    <h2>{heading}</h2>
    <table>
        <tr>
            <th>#</th>
            <th>{key_label}</th>
            <th>{value_label}</th>
        </tr>
{rows}    </table>
</body>
</html>
"#,
        style = STYLE,
        source = escape(page.source_name),
        index = escape(page.index),
        generated_at = escape(page.generated_at),
        chart = escape(page.chart_file),
        heading = escape(&heading),
        key_label = escape(page.key_label),
        value_label = escape(page.value_label),
        rows = rows,
    )
}

/// HTML 文本 / 属性转义
pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page<'a>(entries: &'a [RankedEntry]) -> DashboardPage<'a> {
        DashboardPage {
            index: "inventario",
            source_name: "inventario.csv",
            chart_file: "plot.png",
            key_label: "Material",
            value_label: "Closing stock",
            top_n: 10,
            generated_at: "2024-01-02 10:00:00",
            entries,
        }
    }

    #[test]
    fn renders_rows_in_rank_order() {
        let entries = vec![RankedEntry::new("A", 30), RankedEntry::new("B", 5)];
        let html = render_html(&page(&entries));

        let a = html.find("<td>1</td><td>A</td><td>30</td>").expect("row A");
        let b = html.find("<td>2</td><td>B</td><td>5</td>").expect("row B");
        assert!(a < b);
        assert!(html.contains(r#"<img src="plot.png""#));
        assert!(html.contains("<h2>Top 10 by closing stock</h2>"));
        assert!(html.contains(r#"index "inventario""#));
    }

    #[test]
    fn every_entry_gets_one_row() {
        let entries: Vec<RankedEntry> = (0..10).map(|i| RankedEntry::new(format!("M{}", i), 100 - i)).collect();
        let html = render_html(&page(&entries));
        assert_eq!(html.matches("<tr><td>").count(), 10);
        assert!(html.contains("<td>10</td><td>M9</td><td>91</td></tr>\n    </table>"));
    }

    #[test]
    fn empty_ranking_renders_placeholder_row() {
        let html = render_html(&page(&[]));
        assert!(html.contains("No data"));
        assert!(html.contains("</table>"));
    }

    #[test]
    fn material_names_are_escaped() {
        let entries = vec![RankedEntry::new("<script>alert('x')</script> & co", 1)];
        let html = render_html(&page(&entries));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; co"));
    }

    #[test]
    fn escape_borrows_plain_text() {
        assert!(matches!(escape("Tornillo M6"), Cow::Borrowed(_)));
        assert_eq!(escape(r#"a"b"#), "a&quot;b");
    }
}
