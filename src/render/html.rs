use serde::Serialize;

/// One chart written during the run.
#[derive(Debug, Clone, Serialize)]
pub struct ChartEntry {
    pub label: String,
    /// File name relative to the report, which lives in the same directory.
    pub file: String,
    pub bins: usize,
    pub total: u64,
    pub mean: f64,
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub title: String,
    pub input: String,
    pub time_kind: String,
    pub resolution: String,
    pub window_sec: Option<f64>,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub windowed_rows: usize,
    pub charts: Vec<ChartEntry>,
}

/// Render the run summary as one HTML file with the JSON inlined.
///
/// The page script is full of braces, so the JSON is spliced in with
/// `replace` on a placeholder rather than through `format!`.
pub fn render_html_report(data: &ReportData) -> anyhow::Result<String> {
    // "</" inside a string literal would close the script element early.
    let json = serde_json::to_string(data)?.replace("</", "<\\/");

    const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>netlog-plot report</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 0; }
  header { padding: 12px 16px; border-bottom: 1px solid #ddd; }
  h1 { font-size: 18px; margin: 0 0 8px 0; }
  .summary { display: flex; gap: 16px; flex-wrap: wrap; font-size: 14px; color: #333; }
  .pill { padding: 4px 8px; border: 1px solid #ddd; border-radius: 999px; background: #fafafa; }
  .main { padding: 12px 16px; }
  .card { border: 1px solid #eee; border-radius: 6px; padding: 12px; margin-bottom: 16px; }
  .card h2 { font-size: 16px; margin: 0 0 8px 0; }
  .card img { max-width: 100%; border: 1px solid #f0f0f0; }
  .muted { color: #777; font-size: 12px; }

  table { border-collapse: collapse; width: 100%; margin-bottom: 16px; }
  th, td { border-bottom: 1px solid #eee; padding: 6px 8px; text-align: left; font-size: 14px; }
  th { background: white; border-bottom: 1px solid #ddd; }
  .num { text-align: right; font-variant-numeric: tabular-nums; }
  code { font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, monospace; font-size: 13px; }
</style>
</head>
<body>
<header>
  <h1 id="title"></h1>
  <div class="summary" id="summary"></div>
</header>

<div class="main">
  <table>
    <thead>
      <tr>
        <th>series</th>
        <th class="num">bins</th>
        <th class="num">rows</th>
        <th class="num">mean</th>
        <th class="num">std dev</th>
        <th>file</th>
      </tr>
    </thead>
    <tbody id="statsBody"></tbody>
  </table>
  <div id="charts"></div>
</div>

<script>
// Embedded report data (JSON object literal)
const DATA = __DATA__;

function fmt(x) {
  return (x === null || x === undefined) ? "n/a" : x.toFixed(2);
}

function escapeHtml(s) {
  return String(s)
    .replaceAll("&", "&amp;")
    .replaceAll("<", "&lt;")
    .replaceAll(">", "&gt;")
    .replaceAll('"', "&quot;")
    .replaceAll("'", "&#39;");
}

function renderSummary() {
  document.getElementById("title").textContent = DATA.title;
  const win = DATA.window_sec === null ? "none" : `${DATA.window_sec} s`;
  document.getElementById("summary").innerHTML = `
    <span class="pill">input: <code>${escapeHtml(DATA.input)}</code></span>
    <span class="pill">time: <b>${escapeHtml(DATA.time_kind)}</b></span>
    <span class="pill">resolution: <b>${escapeHtml(DATA.resolution)}</b></span>
    <span class="pill">window: <b>${win}</b></span>
    <span class="pill">rows: <b>${DATA.total_rows}</b></span>
    <span class="pill">valid: <b>${DATA.valid_rows}</b></span>
    <span class="pill">in window: <b>${DATA.windowed_rows}</b></span>
  `;
}

function renderCharts() {
  const body = document.getElementById("statsBody");
  const charts = document.getElementById("charts");
  for (const c of DATA.charts) {
    const tr = document.createElement("tr");
    tr.innerHTML = `
      <td>${escapeHtml(c.label)}</td>
      <td class="num">${c.bins}</td>
      <td class="num">${c.total}</td>
      <td class="num">${fmt(c.mean)}</td>
      <td class="num">${fmt(c.std_dev)}</td>
      <td><code>${escapeHtml(c.file)}</code></td>
    `;
    body.appendChild(tr);

    const card = document.createElement("div");
    card.className = "card";
    card.innerHTML = `
      <h2>${escapeHtml(c.label)}</h2>
      <img src="${encodeURI(c.file)}" alt="${escapeHtml(c.label)}">
      <div class="muted">${c.bins} bins, ${c.total} rows</div>
    `;
    charts.appendChild(card);
  }
}

renderSummary();
renderCharts();
</script>
</body>
</html>
"#;

    Ok(TEMPLATE.replace("__DATA__", &json))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(label: &str) -> ReportData {
        ReportData {
            title: "response: packets per ms bin".to_string(),
            input: "response.csv".to_string(),
            time_kind: "numeric".to_string(),
            resolution: "ms".to_string(),
            window_sec: Some(10.0),
            total_rows: 5,
            valid_rows: 4,
            windowed_rows: 4,
            charts: vec![ChartEntry {
                label: label.to_string(),
                file: "response_DNS_packets_per_ms_up_to_10.0_sec.png".to_string(),
                bins: 2,
                total: 4,
                mean: 2.0,
                std_dev: Some(0.0),
            }],
        }
    }

    #[test]
    fn embeds_report_json() {
        let html = render_html_report(&data("DNS")).unwrap();

        assert!(!html.contains("__DATA__"));
        assert!(html.contains(r#""file":"response_DNS_packets_per_ms_up_to_10.0_sec.png""#));
        assert!(html.contains(r#""window_sec":10.0"#));
    }

    #[test]
    fn labels_cannot_close_the_script() {
        let html = render_html_report(&data("</script><b>x")).unwrap();
        assert_eq!(html.matches("</script>").count(), 1);
    }
}
