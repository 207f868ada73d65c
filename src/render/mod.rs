pub mod chart;
pub mod html;

pub use chart::{render_bar_chart, ChartFormat, ChartLabels};
pub use html::{render_html, DashboardPage};
