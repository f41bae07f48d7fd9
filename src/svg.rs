use crate::graph::Graph;
use crate::projection::SURFACE_SIZE;
use maud::{Markup, html};

const AXIS_COLOR: &str = "#9ca3af";
const POINT_COLOR: &str = "#ef4444";
const TICK_LENGTH: f64 = 2.0;

/// Render a graph as a standalone SVG document on the 100x100 surface.
pub fn render(graph: &Graph) -> Markup {
    let view_box = format!("0 0 {SURFACE_SIZE} {SURFACE_SIZE}");
    let label_x = TICK_LENGTH + 1.0;
    let tick_top = SURFACE_SIZE - TICK_LENGTH;
    let label_y = tick_top - 1.0;
    html! {
        svg xmlns="http://www.w3.org/2000/svg" viewBox=(view_box) {
            @for tick in &graph.y_ticks {
                line x1="0" x2=(TICK_LENGTH) y1=(tick.position) y2=(tick.position)
                    stroke=(AXIS_COLOR) stroke-width="0.5" stroke-linecap="round" {}
                text x=(label_x) y=(tick.position) font-size="3"
                    dominant-baseline="middle" fill=(AXIS_COLOR) { (tick.weight) }
            }
            @for tick in &graph.x_ticks {
                line x1=(tick.position) x2=(tick.position) y1=(SURFACE_SIZE)
                    y2=(tick_top) stroke=(AXIS_COLOR) stroke-width="0.5" {}
                text x=(tick.position) y=(label_y) font-size="3"
                    text-anchor="middle" fill=(AXIS_COLOR) { (tick.day) }
            }
            @if let Some(trend) = graph.trend {
                line x1=(trend.from.x) y1=(trend.from.y) x2=(trend.to.x) y2=(trend.to.y)
                    stroke=(AXIS_COLOR) stroke-width="0.5" stroke-linecap="round" {}
            }
            @for p in &graph.points {
                circle cx=(p.x) cy=(p.y) r="1.5" fill=(POINT_COLOR) {}
            }
        }
    }
}
