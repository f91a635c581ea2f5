use std::fmt::Write;

use owo_colors::{OwoColorize, Style};
use town_builder::{
    BlockType, ObjectType, Point, World,
    catalog::{GrassVariant, HouseColor, RoadShape},
    world::Tile,
};

fn road_glyph(shape: RoadShape) -> char {
    use RoadShape::*;
    match shape {
        Isolated => 'o',
        TopEnd => '╷',
        BottomEnd => '╵',
        LeftEnd => '╶',
        RightEnd => '╴',
        Vertical => '│',
        Horizontal => '─',
        CornerTopRight => '└',
        CornerBottomRight => '┌',
        CornerBottomLeft => '┐',
        CornerTopLeft => '┘',
        TeeNoTop => '┬',
        TeeNoRight => '┤',
        TeeNoBottom => '┴',
        TeeNoLeft => '├',
        Junction => '┼',
    }
}

fn house_style(color: HouseColor) -> Style {
    let style = Style::new().bold();
    match color {
        HouseColor::Red => style.red(),
        HouseColor::Blue => style.blue(),
        HouseColor::Green => style.bright_green(),
        HouseColor::Yellow => style.yellow(),
        HouseColor::White => style.white(),
    }
}

/// Objects are drawn over their block.
fn glyph(tile: &Tile) -> (char, Style) {
    match tile.object.kind {
        ObjectType::PlantedTree => return ('.', Style::new().green()),
        ObjectType::GrowingTree => return ('t', Style::new().green()),
        ObjectType::MatureTree => return ('T', Style::new().green().bold()),
        ObjectType::House(color) => return ('H', house_style(color)),
        ObjectType::Occupied { .. } => return ('#', Style::new().dimmed()),
        ObjectType::Empty => {}
    }
    match tile.block.kind {
        BlockType::Base => (' ', Style::new()),
        BlockType::Grass(GrassVariant::One) => (',', Style::new().green()),
        BlockType::Grass(GrassVariant::Two) => ('"', Style::new().bright_green()),
        BlockType::Cleared => ('·', Style::new().yellow()),
        BlockType::Road(shape) => (road_glyph(shape), Style::new().bright_white()),
    }
}

/// The world as colored text, one line per row, with column and row indices
/// in the margins.
pub fn draw(world: &World, selected: Option<Point>) -> String {
    let mut out = String::new();
    let width = world.dims().width;

    _ = write!(out, "    ");
    for x in 0..width {
        _ = write!(out, "{}", (x % 10).dimmed());
    }
    out.push('\n');

    for (y, row) in world.tiles().iter_rows().enumerate() {
        _ = write!(out, "{y:>3} ");
        for (x, tile) in row.iter().enumerate() {
            let (ch, mut style) = glyph(tile);
            if selected == Some(Point::new(x as isize, y as isize)) {
                style = style.on_blue();
            }
            _ = write!(out, "{}", ch.style(style));
        }
        out.push('\n');
    }
    out
}

pub fn describe(world: &World, point: Point) -> anyhow::Result<String> {
    let tile = world.tile(point)?;
    let mut text = format!(
        "{point}: {} ({}°), {} ({}°)",
        tile.block.kind,
        tile.block.rotation.degrees(),
        tile.object.kind,
        tile.object.rotation.degrees()
    );
    if let Some(house) = world.house_at(point)? {
        _ = write!(text, ", part of the house at {}", house.anchor());
    }
    Ok(text)
}
