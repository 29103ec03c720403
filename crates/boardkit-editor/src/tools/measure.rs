use boardkit_core::Point;

use super::{CursorShape, EventResult, Preview, Tool, ToolContext, ToolKind};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Measurement {
    Idle,
    /// `end` follows the pointer
    Measuring { start: Point, end: Point },
    Fixed { start: Point, end: Point },
}

/// Distance measurement between two snapped points
#[derive(Debug)]
pub struct MeasureTool {
    state: Measurement,
}

impl Default for MeasureTool {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasureTool {
    pub fn new() -> Self {
        Self {
            state: Measurement::Idle,
        }
    }

    /// The current start and end, if a measurement is shown.
    pub fn measurement(&self) -> Option<(Point, Option<Point>)> {
        match self.state {
            Measurement::Idle => None,
            Measurement::Measuring { start, .. } => Some((start, None)),
            Measurement::Fixed { start, end } => Some((start, Some(end))),
        }
    }

    /// Overlay text, e.g. `Δx: 3.000 mm, Δy: 4.000 mm, distance: 5.000 mm`.
    pub fn format(start: Point, end: Point) -> String {
        let d = end - start;
        format!(
            "Δx: {:.3} mm, Δy: {:.3} mm, distance: {:.3} mm",
            d.x,
            d.y,
            start.distance(&end)
        )
    }

    /// Item vertices within tolerance win over the grid.
    fn snap(ctx: &ToolContext<'_>, pos: Point) -> Point {
        if ctx.modifiers.shift {
            return pos;
        }
        ctx.document
            .nearest_vertex(&pos, ctx.tolerance())
            .unwrap_or_else(|| ctx.document.grid.snap(pos))
    }

    fn show(ctx: &ToolContext<'_>, start: Point, end: Point) {
        ctx.preview(Preview::Measure { start, end });
        ctx.overlay(Some(Self::format(start, end)));
    }

    fn clear(&mut self, ctx: &ToolContext<'_>) {
        self.state = Measurement::Idle;
        ctx.preview(Preview::None);
        ctx.overlay(None);
    }
}

impl Tool for MeasureTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Measure
    }

    fn enter(&mut self, ctx: &mut ToolContext<'_>) {
        self.state = Measurement::Idle;
        ctx.cursor(CursorShape::Cross);
    }

    fn leave(&mut self, ctx: &mut ToolContext<'_>) {
        self.clear(ctx);
        ctx.cursor(CursorShape::Arrow);
    }

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        let pos = Self::snap(ctx, pos);
        self.state = match self.state {
            Measurement::Measuring { start, .. } => {
                Self::show(ctx, start, pos);
                Measurement::Fixed { start, end: pos }
            }
            Measurement::Idle | Measurement::Fixed { .. } => {
                Self::show(ctx, pos, pos);
                Measurement::Measuring { start: pos, end: pos }
            }
        };
        EventResult::Handled
    }

    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        match self.state {
            Measurement::Measuring { start, .. } => {
                let end = Self::snap(ctx, pos);
                Self::show(ctx, start, end);
                self.state = Measurement::Measuring { start, end };
                EventResult::Handled
            }
            _ => EventResult::Unhandled,
        }
    }

    fn overlay_text(&self) -> Option<String> {
        match self.state {
            Measurement::Idle => None,
            Measurement::Measuring { start, end } | Measurement::Fixed { start, end } => {
                Some(Self::format(start, end))
            }
        }
    }

    fn abort(&mut self, ctx: &mut ToolContext<'_>) -> bool {
        if self.state == Measurement::Idle {
            return false;
        }
        self.clear(ctx);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_overlay() {
        let text = MeasureTool::format(Point::new(1.0, 1.0), Point::new(4.0, 5.0));
        assert_eq!(text, "Δx: 3.000 mm, Δy: 4.000 mm, distance: 5.000 mm");
    }
}
