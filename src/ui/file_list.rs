use iced::widget::{button, row, scrollable, text, Column};
use iced::{Color, Element, Length};

use crate::state::catalog::CatalogEntry;
use crate::state::data::Marker;
use crate::Message;

/// Badge colour for a keep/delete marker
fn marker_color(marker: Marker) -> Color {
    match marker {
        Marker::None => Color::from_rgb(0.5, 0.5, 0.5),
        Marker::Keep => Color::from_rgb(0.3, 0.8, 0.4),
        Marker::Delete => Color::from_rgb(0.9, 0.3, 0.3),
    }
}

/// Listing of the current page. Clicking a row jumps to that file.
pub fn view(items: &[CatalogEntry], active: Option<usize>) -> Element<'_, Message> {
    let mut list = Column::new().spacing(2);

    for (index, entry) in items.iter().enumerate() {
        let marker = Marker::from(entry.delete_action);
        let label = row![
            text(marker.label()).color(marker_color(marker)).width(Length::Fixed(18.0)),
            text(entry.filename.as_str()).size(14),
        ]
        .spacing(4);

        let style = if Some(index) == active {
            button::primary
        } else {
            button::text
        };

        list = list.push(
            button(label)
                .on_press(Message::Select(entry.filename.clone()))
                .style(style)
                .width(Length::Fill)
                .padding([2, 6]),
        );
    }

    scrollable(list)
        .height(Length::Fill)
        .into()
}

/// "Page x of y" line under the listing
pub fn page_label(page: usize, page_count: usize) -> Element<'static, Message> {
    let label = if page_count == 0 {
        "No images".to_string()
    } else {
        format!("Page {} of {}", page + 1, page_count)
    };

    text(label).size(14).into()
}
