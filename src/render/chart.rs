use crate::error::{AppError, AppResult};
use crate::models::RankedEntry;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

const SIZE: (u32, u32) = (2000, 1000);
const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);
const FONT_FAMILY: &str = "sans-serif";

/// 内置字体 (DejaVu Sans), 位图绘制文字不依赖系统字体
static FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();

/// 图表输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartFormat {
    #[default]
    Png,
    Svg,
}

impl ChartFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            ChartFormat::Png => "plot.png",
            ChartFormat::Svg => "plot.svg",
        }
    }
}

impl FromStr for ChartFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ChartFormat::Png),
            "svg" => Ok(ChartFormat::Svg),
            other => Err(format!("unknown chart format '{}', expected 'png' or 'svg'", other)),
        }
    }
}

impl fmt::Display for ChartFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChartFormat::Png => "png",
            ChartFormat::Svg => "svg",
        })
    }
}

/// 图表文字
#[derive(Debug, Clone)]
pub struct ChartLabels {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
}

/// 绘制排名柱状图, 覆盖已有文件
pub fn render_bar_chart(
    entries: &[RankedEntry],
    labels: &ChartLabels,
    format: ChartFormat,
    path: &Path,
) -> AppResult<()> {
    ensure_font()?;

    match format {
        ChartFormat::Png => {
            let root = BitMapBackend::new(path, SIZE).into_drawing_area();
            draw_bars(&root, entries, labels)?;
            root.present().map_err(chart_error)?;
        }
        ChartFormat::Svg => {
            let root = SVGBackend::new(path, SIZE).into_drawing_area();
            draw_bars(&root, entries, labels)?;
            root.present().map_err(chart_error)?;
        }
    }
    tracing::info!("Chart written to {}", path.display());
    Ok(())
}

fn draw_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    entries: &[RankedEntry],
    labels: &ChartLabels,
) -> AppResult<()> {
    root.fill(&WHITE).map_err(chart_error)?;

    // 至少留一个槽位, 空数据也能画出坐标系
    let slots = entries.len().max(1) as u32;
    let y_min = entries.iter().map(|e| e.stock).min().unwrap_or(0).min(0);
    let y_top = entries.iter().map(|e| e.stock).max().unwrap_or(0).max(0);
    let y_max = y_top + (y_top - y_min) / 10 + 1;

    let mut chart = ChartBuilder::on(root)
        .margin(40)
        .caption(&labels.title, (FONT_FAMILY, 36))
        .x_label_area_size(160)
        .y_label_area_size(90)
        .build_cartesian_2d((0u32..slots).into_segmented(), y_min..y_max)
        .map_err(chart_error)?;

    let names: Vec<&str> = entries.iter().map(|e| e.material.as_str()).collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(names.len().max(1))
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => names.get(*i as usize).map(|s| s.to_string()).unwrap_or_default(),
            _ => String::new(),
        })
        .x_label_style((FONT_FAMILY, 18).into_font().transform(FontTransform::Rotate90))
        .y_label_style((FONT_FAMILY, 18))
        .axis_desc_style((FONT_FAMILY, 22))
        .x_desc(labels.x_desc.as_str())
        .y_desc(labels.y_desc.as_str())
        .draw()
        .map_err(chart_error)?;

    chart
        .draw_series(entries.iter().enumerate().map(|(i, e)| {
            let i = i as u32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0i64), (SegmentValue::Exact(i + 1), e.stock)],
                BAR_COLOR.filled(),
            );
            bar.set_margin(0, 0, 8, 8);
            bar
        }))
        .map_err(chart_error)?;

    // 基线
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(SegmentValue::Exact(0u32), 0i64), (SegmentValue::Exact(slots), 0i64)],
            BLACK.stroke_width(2),
        )))
        .map_err(chart_error)?;

    Ok(())
}

/// 注册内置字体 (进程内只做一次)
fn ensure_font() -> AppResult<()> {
    FONT_REGISTERED
        .get_or_init(|| {
            register_font(FONT_FAMILY, FontStyle::Normal, FONT_DATA)
                .map_err(|_| "bundled font could not be loaded".to_string())
        })
        .clone()
        .map_err(AppError::Chart)
}

fn chart_error<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> AppError {
    AppError::Chart(e.to_string())
}
