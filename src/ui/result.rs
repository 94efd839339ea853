/// Progress and result panel

use iced::widget::{button, column, container, horizontal_space, progress_bar, row, text};
use iced::{Alignment, Element, Length};

use crate::download::DownloadState;
use crate::state::history::dimension_label;
use crate::state::progress::{Progress, StepMarker, STEP_COUNT, STEP_LABELS};
use crate::{Message, RenderedResult, ResultState, RetouchStudio};

pub fn view(app: &RetouchStudio) -> Element<'_, Message> {
    column![progress_section(&app.progress), result_section(app)]
        .spacing(15)
        .into()
}

fn progress_section(progress: &Progress) -> Element<'_, Message> {
    let mut steps = row![].spacing(20);
    for index in 0..STEP_COUNT {
        steps = steps.push(step_marker(progress, index));
    }

    let status = if progress.is_waiting() {
        text(&progress.status).size(14).color(super::dim_color())
    } else {
        text(&progress.status).size(14)
    };

    column![
        row![
            status,
            horizontal_space(),
            text(format!("{}%", progress.percent.round() as u32)).size(14),
        ]
        .align_y(Alignment::Center),
        progress_bar(0.0..=100.0, progress.percent).height(Length::Fixed(10.0)),
        steps,
    ]
    .spacing(8)
    .into()
}

fn step_marker(progress: &Progress, index: usize) -> Element<'_, Message> {
    let (symbol, color) = match progress.marker(index) {
        StepMarker::Completed => ("✓", super::success_color()),
        StepMarker::Active => ("●", super::accent_color()),
        StepMarker::Pending => ("○", super::dim_color()),
    };

    row![
        text(symbol).size(14).color(color),
        text(STEP_LABELS[index]).size(12),
    ]
    .spacing(4)
    .align_y(Alignment::Center)
    .into()
}

fn result_section(app: &RetouchStudio) -> Element<'_, Message> {
    match &app.result {
        ResultState::Idle => container(
            text("修图结果将显示在这里").size(14).color(super::dim_color()),
        )
        .width(Length::Fill)
        .padding(40)
        .center_x(Length::Fill)
        .style(container::bordered_box)
        .into(),
        ResultState::Ready(result) => ready_section(app, result),
        ResultState::Failed {
            message,
            rate_limited: true,
        } => rate_limit_panel(message),
        ResultState::Failed { message, .. } => container(
            text(format!("Error: {}", message))
                .size(14)
                .color(super::danger_color()),
        )
        .width(Length::Fill)
        .padding(20)
        .style(container::bordered_box)
        .into(),
    }
}

fn ready_section<'a>(app: &'a RetouchStudio, result: &'a RenderedResult) -> Element<'a, Message> {
    let info = row![
        text(format!("处理时间: {}ms", result.processing_ms)).size(13),
        text(format!(
            "输出尺寸: {}",
            dimension_label(result.width, result.height)
        ))
        .size(13),
        text(format!("使用模型: {}", result.model)).size(13),
    ]
    .spacing(20);

    column![
        iced::widget::image(result.handle.clone()).width(Length::Fill),
        info,
        download_button(app, result),
    ]
    .spacing(10)
    .into()
}

fn download_button<'a>(
    app: &'a RetouchStudio,
    result: &'a RenderedResult,
) -> Element<'a, Message> {
    let state = app.download;
    let label = match state {
        DownloadState::Downloading => "下载中...".to_string(),
        DownloadState::Success => "下载完成！".to_string(),
        DownloadState::Idle => {
            if result.dims_from_resize {
                format!("下载图片 {}×{}", result.width, result.height)
            } else {
                "下载图片".to_string()
            }
        }
    };

    button(text(label))
        .padding(10)
        .style(move |theme, status| match state {
            DownloadState::Success => button::success(theme, status),
            _ => button::primary(theme, status),
        })
        .on_press_maybe(
            matches!(state, DownloadState::Idle).then_some(Message::DownloadCurrent),
        )
        .into()
}

fn rate_limit_panel(message: &str) -> Element<'_, Message> {
    container(
        column![
            text("⚠️ 达到API调用限制").size(18),
            text("您已达到今日的免费API调用限制。").size(14),
            text("解决方案：").size(14),
            text("• 添加自己的API Key（推荐）：在设置中输入您的API密钥").size(13),
            text("• 等待重置：免费额度每天重置，您可以明天再试").size(13),
            text("• 升级计划：购买积分获得更高限制").size(13),
            text(format!("详细错误信息: {}", message))
                .size(12)
                .color(super::dim_color()),
        ]
        .spacing(6),
    )
    .width(Length::Fill)
    .padding(15)
    .style(container::bordered_box)
    .into()
}
