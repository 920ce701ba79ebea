// FleetSleuth - ui/charts.rs
//
// Painter-drawn aggregate charts and scrollable legends shared by the
// dashboard panels. Pure presentation: every chart is a stateless render
// of a (category, count) list computed by the caller each frame.

use crate::ui::theme;
use crate::util::constants;
use egui::{Color32, Sense};
use std::collections::HashMap;

/// Count occurrences of a category value, sorted by count descending and
/// then alphabetically so the ordering (and therefore the palette
/// assignment) is stable across repaints.
pub fn value_counts<I, S>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        *counts.entry(value.as_ref().to_string()).or_insert(0) += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}

/// Assign a stable palette colour per category from a sorted counts list.
pub fn colour_map(counts: &[(String, usize)]) -> HashMap<String, Color32> {
    counts
        .iter()
        .enumerate()
        .map(|(i, (category, _))| (category.clone(), theme::palette_colour(i)))
        .collect()
}

/// Horizontal bar chart of category counts. Bars are clickable; returns
/// the clicked category so callers can drill down.
///
/// Bars are scaled against the maximum count. Long category labels are
/// truncated with an ellipsis but carry a hover tooltip with the full text.
pub fn bar_chart(
    ui: &mut egui::Ui,
    id_salt: &str,
    counts: &[(String, usize)],
    colours: &HashMap<String, Color32>,
) -> Option<String> {
    if counts.is_empty() {
        ui.weak("Sin datos.");
        return None;
    }

    let max_count = counts.iter().map(|(_, c)| *c).max().unwrap_or(1).max(1);
    let mut clicked = None;

    egui::ScrollArea::vertical()
        .id_salt(id_salt)
        .max_height(theme::CHART_HEIGHT)
        .auto_shrink([false, true])
        .show(ui, |ui| {
            for (category, count) in counts {
                let colour = colours
                    .get(category)
                    .copied()
                    .unwrap_or(Color32::GRAY);

                ui.horizontal(|ui| {
                    // Fixed-width truncated label column.
                    let label = truncate_label(category, 24);
                    let label_response = ui.add_sized(
                        [170.0, theme::BAR_THICKNESS],
                        egui::Label::new(egui::RichText::new(&label).size(12.0)).truncate(),
                    );
                    if label != *category {
                        label_response.on_hover_text(category);
                    }

                    // The bar itself, clickable for drill-down.
                    let available = ui.available_width() - 48.0;
                    let fraction = *count as f32 / max_count as f32;
                    let bar_width = (available * fraction).max(2.0);
                    let (rect, response) = ui.allocate_exact_size(
                        egui::vec2(bar_width, theme::BAR_THICKNESS),
                        Sense::click(),
                    );
                    let fill = if response.hovered() {
                        colour.gamma_multiply(1.3)
                    } else {
                        colour
                    };
                    ui.painter().rect_filled(rect, 2.0, fill);
                    if response.clicked() {
                        clicked = Some(category.clone());
                    }
                    response.on_hover_text(format!("{category}: {count}"));

                    ui.label(egui::RichText::new(count.to_string()).size(12.0).weak());
                });
            }
        });

    clicked
}

/// Single stacked proportion bar with an inline legend underneath.
///
/// Used for two-valued status breakdowns (connectivity, operability,
/// update status) where a full chart would be overkill.
pub fn proportion_bar(ui: &mut egui::Ui, parts: &[(&str, usize, Color32)]) {
    let total: usize = parts.iter().map(|(_, c, _)| c).sum();
    if total == 0 {
        ui.weak("Sin datos.");
        return;
    }

    let (rect, _) = ui.allocate_exact_size(
        egui::vec2(ui.available_width(), theme::BAR_THICKNESS),
        Sense::hover(),
    );

    let mut x = rect.left();
    for (label, count, colour) in parts {
        if *count == 0 {
            continue;
        }
        let width = rect.width() * (*count as f32 / total as f32);
        let segment = egui::Rect::from_min_size(
            egui::pos2(x, rect.top()),
            egui::vec2(width, rect.height()),
        );
        ui.painter().rect_filled(segment, 0.0, *colour);
        // One tooltip region per segment.
        ui.interact(
            segment,
            ui.id().with(label),
            Sense::hover(),
        )
        .on_hover_text(format!(
            "{label}: {count} ({:.1}%)",
            *count as f64 / total as f64 * 100.0
        ));
        x += width;
    }

    // Inline legend with counts and percentages.
    ui.horizontal_wrapped(|ui| {
        for (label, count, colour) in parts {
            ui.label(egui::RichText::new("\u{25cf}").color(*colour));
            ui.label(
                egui::RichText::new(format!(
                    "{label} {count} ({:.1}%)",
                    *count as f64 / total as f64 * 100.0
                ))
                .size(12.0),
            );
            ui.add_space(8.0);
        }
    });
}

/// Scrollable legend: one row per category with colour dot, label, count,
/// and percentage share. The fleet's organisation and rate-plan lists run
/// to hundreds of entries, hence the scroll region.
pub fn legend(
    ui: &mut egui::Ui,
    id_salt: &str,
    counts: &[(String, usize)],
    colours: &HashMap<String, Color32>,
) {
    if counts.is_empty() {
        ui.weak("Sin datos.");
        return;
    }

    let total: usize = counts.iter().map(|(_, c)| c).sum();
    let shown = counts.len().min(constants::MAX_LEGEND_ROWS);

    egui::ScrollArea::vertical()
        .id_salt(id_salt)
        .max_height(theme::LEGEND_MAX_HEIGHT)
        .auto_shrink([false, true])
        .show(ui, |ui| {
            egui::Grid::new(format!("{id_salt}_grid"))
                .num_columns(3)
                .spacing([8.0, 3.0])
                .striped(true)
                .show(ui, |ui| {
                    for (category, count) in &counts[..shown] {
                        let colour = colours
                            .get(category)
                            .copied()
                            .unwrap_or(Color32::GRAY);
                        let percent = *count as f64 / total as f64 * 100.0;

                        ui.label(egui::RichText::new("\u{25cf}").color(colour));
                        ui.add(
                            egui::Label::new(
                                egui::RichText::new(truncate_label(category, 32)).size(12.0),
                            )
                            .truncate(),
                        )
                        .on_hover_text(category);
                        ui.label(
                            egui::RichText::new(format!("{count} ({percent:.1}%)"))
                                .size(11.5)
                                .strong(),
                        );
                        ui.end_row();
                    }
                });

            if counts.len() > shown {
                ui.label(
                    egui::RichText::new(format!("... y {} más", counts.len() - shown))
                        .weak()
                        .small()
                        .italics(),
                );
            }
        });
}

/// Truncate a label to `max` characters with a trailing ellipsis.
fn truncate_label(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        label.to_string()
    } else {
        let truncated: String = label.chars().take(max.saturating_sub(1)).collect();
        format!("{truncated}\u{2026}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_counts_sorted_desc_then_alpha() {
        let counts = value_counts(["b", "a", "b", "c", "a", "b"]);
        assert_eq!(
            counts,
            vec![
                ("b".to_string(), 3),
                ("a".to_string(), 2),
                ("c".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_value_counts_ties_break_alphabetically() {
        let counts = value_counts(["z", "a"]);
        assert_eq!(counts[0].0, "a");
        assert_eq!(counts[1].0, "z");
    }

    #[test]
    fn test_colour_map_is_stable_by_position() {
        let counts = vec![("x".to_string(), 5), ("y".to_string(), 2)];
        let map = colour_map(&counts);
        assert_eq!(map["x"], theme::palette_colour(0));
        assert_eq!(map["y"], theme::palette_colour(1));
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short", 10), "short");
        assert_eq!(truncate_label("0123456789", 5), "0123\u{2026}");
    }
}
