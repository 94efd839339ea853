/// History screen: persisted records, newest first

use iced::widget::{button, column, container, horizontal_space, row, scrollable, text, Column};
use iced::{Alignment, Element, Length};

use crate::state::history::{truncate_prompt, HistoryRecord};
use crate::{Message, RetouchStudio};

/// Characters of the prompt shown in a record card
const PROMPT_PREVIEW_CHARS: usize = 100;

pub fn view(app: &RetouchStudio) -> Element<'_, Message> {
    let header = row![
        text("历史记录").size(28),
        horizontal_space(),
        button(text("清空历史"))
            .padding(8)
            .style(button::danger)
            .on_press_maybe((!app.history.is_empty()).then_some(Message::ClearHistory)),
        button(text("关闭")).padding(8).on_press(Message::CloseHistory),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let body: Element<'_, Message> = if app.history.is_empty() {
        container(text("暂无历史记录").size(16).color(super::dim_color()))
            .width(Length::Fill)
            .padding(40)
            .center_x(Length::Fill)
            .into()
    } else {
        let total = app.history.len();
        let cards: Vec<Element<'_, Message>> = app
            .history
            .iter()
            .enumerate()
            .map(|(index, record)| card(app, total, index, record))
            .collect();
        scrollable(Column::with_children(cards).spacing(12))
            .height(Length::Fill)
            .into()
    };

    column![header, body].spacing(15).padding(20).into()
}

fn card<'a>(
    app: &'a RetouchStudio,
    total: usize,
    index: usize,
    record: &'a HistoryRecord,
) -> Element<'a, Message> {
    let title = row![
        text(format!("修图记录 {}", total - index)).size(16),
        horizontal_space(),
        text(record.display_time()).size(12).color(super::dim_color()),
    ]
    .align_y(Alignment::Center);

    let details = row![
        text(format!("处理时间: {}ms", record.processing_time_ms)).size(12),
        text(format!("使用模型: {}", record.model)).size(12),
        text(format!("输出尺寸: {}", record.output_dimensions)).size(12),
    ]
    .spacing(15);

    let actions = row![
        button(text("下载"))
            .padding(6)
            .on_press(Message::DownloadHistory(record.id)),
        button(text("删除"))
            .padding(6)
            .style(button::danger)
            .on_press(Message::DeleteHistory(record.id)),
    ]
    .spacing(8);

    let main = column![
        title,
        details,
        text(truncate_prompt(&record.prompt, PROMPT_PREVIEW_CHARS)).size(13),
        actions,
    ]
    .spacing(8)
    .width(Length::Fill);

    let mut content = row![main].spacing(12).align_y(Alignment::Center);
    if let Some(handle) = app.history_previews.get(&record.id) {
        content = content.push(
            iced::widget::image(handle.clone()).width(Length::Fixed(120.0)),
        );
    }

    container(content)
        .width(Length::Fill)
        .padding(12)
        .style(container::bordered_box)
        .into()
}
