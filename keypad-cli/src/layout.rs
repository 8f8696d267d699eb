//! Render the keypad face with the pins wired to each row and column.

use keypad::{PinId, Position, COLS, ROWS};

/// Key unit size in SVG pixels.
const U: f64 = 64.0;
/// Gap between keys.
const GAP: f64 = 8.0;
/// Step: key + gap.
const S: f64 = U + GAP;
/// Key corner radius.
const R: f64 = 6.0;
/// Room on the left and top for the pin labels.
const LABEL: f64 = 56.0;
/// Margin around the SVG content.
const MARGIN: f64 = 20.0;

fn key_class(symbol: char) -> &'static str {
    match symbol {
        '0'..='9' => "key digit",
        'A'..='D' => "key letter",
        _ => "key symbol",
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn render_keys(strobe: &[PinId; ROWS], sense: &[PinId; COLS]) -> String {
    let mut svg = format!(r#"<g transform="translate({MARGIN}, {MARGIN})">"#);

    for (col, pin) in sense.iter().enumerate() {
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" class="pin">C{col} · pin {pin}</text>"#,
            LABEL + col as f64 * S + U / 2.0,
            LABEL / 2.0,
        ));
    }
    for (row, pin) in strobe.iter().enumerate() {
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" class="pin">R{row} · pin {pin}</text>"#,
            LABEL / 2.0,
            LABEL + row as f64 * S + U / 2.0,
        ));
    }

    for pos in Position::all() {
        let x = LABEL + pos.col() as f64 * S;
        let y = LABEL + pos.row() as f64 * S;
        let symbol = pos.symbol();
        svg.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{U}" height="{U}" rx="{R}" class="{}"/>"#,
            key_class(symbol),
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" class="label">{}</text>"#,
            x + U / 2.0,
            y + U / 2.0 + 1.0,
            html_escape(&symbol.to_string()),
        ));
    }

    svg.push_str("</g>");
    svg
}

/// Generate the complete HTML document with inline SVG.
pub fn generate_html(strobe: &[PinId; ROWS], sense: &[PinId; COLS]) -> String {
    let width = LABEL + COLS as f64 * S - GAP + 2.0 * MARGIN;
    let height = LABEL + ROWS as f64 * S - GAP + 2.0 * MARGIN;

    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Keypad Layout</title>
<style>
  body {{
    background: #1a1a2e;
    color: #eee;
    font-family: system-ui, -apple-system, sans-serif;
    display: flex;
    justify-content: center;
    padding: 2em;
  }}
  .key {{
    fill: #16213e;
    stroke: #0f3460;
    stroke-width: 1.5;
  }}
  .key.letter {{
    fill: #2d1b4e;
    stroke: #e94560;
  }}
  .key.symbol {{
    fill: #1b2e4e;
    stroke: #53a8b6;
  }}
  .label {{
    fill: #eee;
    font-family: "JetBrains Mono", "Fira Code", monospace;
    font-size: 22px;
    text-anchor: middle;
    dominant-baseline: middle;
  }}
  .pin {{
    fill: #8b8fa3;
    font-size: 10px;
    text-anchor: middle;
    dominant-baseline: middle;
  }}
</style>
</head>
<body>
<svg width="{width}" height="{height}" xmlns="http://www.w3.org/2000/svg">
"#
    );

    html.push_str(&render_keys(strobe, sense));
    html.push_str("\n</svg>\n</body>\n</html>\n");
    html
}

/// Plain-text grid for the terminal.
pub fn generate_text(strobe: &[PinId; ROWS], sense: &[PinId; COLS]) -> String {
    let mut out = String::from("          ");
    for pin in sense {
        out.push_str(&format!(" {:>4}", format!("p{pin}")));
    }
    out.push('\n');

    for (row, pin) in strobe.iter().enumerate() {
        out.push_str(&format!("R{row} {:>5} ", format!("p{pin}")));
        for col in 0..COLS {
            let symbol = keypad::lookup(row, col).unwrap_or(' ');
            out.push_str(&format!("  [{symbol}]"));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const STROBE: [PinId; ROWS] = [0, 1, 2, 3];
    const SENSE: [PinId; COLS] = [4, 5, 6, 7];

    #[test]
    fn test_html_has_every_key() {
        let html = generate_html(&STROBE, &SENSE);
        assert_eq!(html.matches("<rect").count(), ROWS * COLS);
        for pos in Position::all() {
            let label = format!(r#"class="label">{}</text>"#, pos.symbol());
            assert!(html.contains(&label), "missing {}", pos.symbol());
        }
    }

    #[test]
    fn test_html_labels_pins() {
        let html = generate_html(&[10, 11, 12, 13], &SENSE);
        assert!(html.contains("R2 · pin 12"));
        assert!(html.contains("C3 · pin 7"));
    }

    #[test]
    fn test_text_rows() {
        let text = generate_text(&STROBE, &SENSE);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), ROWS + 1);
        assert!(lines[3].starts_with("R2"));
        assert!(lines[3].ends_with("[7]  [8]  [9]  [C]"));
        assert!(lines[4].contains("[*]  [0]  [#]  [D]"));
    }
}
