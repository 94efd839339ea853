/// Input panel: mode tabs, image selection, settings and the prompt row

use iced::widget::{button, column, container, row, text, text_editor, text_input, TextInput};
use iced::{Alignment, Element, Length};
use iced_aw::Wrap;

use crate::state::history::dimension_label;
use crate::state::input::{InputMode, SelectedFile, UrlPreview};
use crate::{Message, RetouchStudio};

const THUMBNAIL_SIZE: f32 = 96.0;

pub fn view(app: &RetouchStudio) -> Element<'_, Message> {
    let tabs = row![
        tab_button("上传图片", InputMode::Upload, app.input.mode),
        tab_button("图片URL", InputMode::Url, app.input.mode),
    ]
    .spacing(10);

    let mode_content: Element<'_, Message> = match app.input.mode {
        InputMode::Upload => upload_area(app),
        InputMode::Url => url_area(app),
    };

    column![
        tabs,
        mode_content,
        dimension_row(app),
        settings_fields(app),
        prompt_row(app),
    ]
    .spacing(15)
    .into()
}

fn tab_button(label: &str, mode: InputMode, active_mode: InputMode) -> Element<'_, Message> {
    let active = mode == active_mode;
    button(text(label))
        .padding(10)
        .style(move |theme, status| {
            if active {
                button::primary(theme, status)
            } else {
                button::secondary(theme, status)
            }
        })
        .on_press(Message::SwitchMode(mode))
        .into()
}

fn upload_area(app: &RetouchStudio) -> Element<'_, Message> {
    let mut content = column![
        button(text("选择图片")).padding(10).on_press(Message::PickFiles),
        text("或将图片拖入窗口，相同文件名自动去重").size(13).color(super::dim_color()),
    ]
    .spacing(8)
    .align_x(Alignment::Center);

    if !app.input.files.is_empty() {
        let thumbnails: Vec<Element<'_, Message>> =
            app.input.files.iter().map(file_thumbnail).collect();
        content = content.push(Wrap::with_elements(thumbnails).spacing(8.0).line_spacing(8.0));
    }

    container(content)
        .width(Length::Fill)
        .padding(15)
        .style(container::bordered_box)
        .into()
}

fn file_thumbnail(file: &SelectedFile) -> Element<'_, Message> {
    let preview: Element<'_, Message> = match &file.preview {
        Some(handle) => iced::widget::image(handle.clone())
            .width(Length::Fixed(THUMBNAIL_SIZE))
            .height(Length::Fixed(THUMBNAIL_SIZE))
            .into(),
        None => container(text(&file.name).size(12))
            .width(Length::Fixed(THUMBNAIL_SIZE))
            .height(Length::Fixed(THUMBNAIL_SIZE))
            .padding(6)
            .style(container::rounded_box)
            .into(),
    };

    column![
        preview,
        button(text("×"))
            .padding(4)
            .style(button::danger)
            .on_press(Message::RemoveFile(file.name.clone())),
    ]
    .spacing(4)
    .align_x(Alignment::Center)
    .into()
}

fn url_area(app: &RetouchStudio) -> Element<'_, Message> {
    let editor = text_editor(&app.url_text)
        .placeholder("每行输入一个图片URL")
        .on_action(Message::UrlTextEdited)
        .height(Length::Fixed(100.0));

    let mut content = column![
        editor,
        text("每行一个URL，停止输入后自动解析").size(13).color(super::dim_color()),
    ]
    .spacing(8);

    if !app.input.urls.is_empty() {
        let previews: Vec<Element<'_, Message>> = app
            .input
            .urls
            .iter()
            .zip(app.input.url_previews.iter())
            .enumerate()
            .map(|(index, (url, preview))| url_preview(index, url, preview))
            .collect();
        content = content.push(Wrap::with_elements(previews).spacing(8.0).line_spacing(8.0));
    }

    container(content)
        .width(Length::Fill)
        .padding(15)
        .style(container::bordered_box)
        .into()
}

fn url_preview<'a>(index: usize, url: &'a str, preview: &'a UrlPreview) -> Element<'a, Message> {
    let body: Element<'a, Message> = match preview {
        UrlPreview::Loaded(handle) => iced::widget::image(handle.clone())
            .width(Length::Fixed(THUMBNAIL_SIZE))
            .height(Length::Fixed(THUMBNAIL_SIZE))
            .into(),
        UrlPreview::Loading => container(text("加载中...").size(12))
            .width(Length::Fixed(THUMBNAIL_SIZE))
            .height(Length::Fixed(THUMBNAIL_SIZE))
            .padding(6)
            .style(container::rounded_box)
            .into(),
        UrlPreview::Failed => container(
            text(format!("无法加载图片: {}", url))
                .size(12)
                .color(super::danger_color()),
        )
        .width(Length::Fixed(160.0))
        .height(Length::Fixed(THUMBNAIL_SIZE))
        .padding(6)
        .style(container::rounded_box)
        .into(),
    };

    column![
        body,
        button(text("×"))
            .padding(4)
            .style(button::danger)
            .on_press(Message::RemoveUrl(index)),
    ]
    .spacing(4)
    .align_x(Alignment::Center)
    .into()
}

fn dimension_row(app: &RetouchStudio) -> Element<'_, Message> {
    let original = match (app.input.original_dimensions, app.input.probe_failed) {
        (Some((width, height)), _) => dimension_label(width, height),
        (None, true) => "无法获取尺寸".to_string(),
        (None, false) => "未选择图片".to_string(),
    };
    let target = match app.input.original_dimensions {
        Some((width, height)) => format!("保持 {} × {} 像素", width, height),
        None => "保持原始分辨率".to_string(),
    };

    row![
        text(format!("原始尺寸: {}", original)).size(14),
        text(format!("目标尺寸: {}", target)).size(14),
    ]
    .spacing(30)
    .into()
}

fn settings_fields(app: &RetouchStudio) -> Element<'_, Message> {
    column![
        labeled(
            "API 密钥",
            text_input("sk-...", &app.settings.api_key)
                .secure(true)
                .on_input(Message::ApiKeyChanged)
                .on_submit(Message::Generate)
                .padding(8),
        ),
        labeled(
            "模型",
            text_input("", &app.settings.model)
                .on_input(Message::ModelChanged)
                .padding(8),
        ),
        labeled(
            "API 地址",
            text_input("", &app.settings.api_base_url)
                .on_input(Message::ApiBaseUrlChanged)
                .padding(8),
        ),
        labeled(
            "服务端点",
            text_input("", &app.settings.endpoint)
                .on_input(Message::EndpointChanged)
                .padding(8),
        ),
    ]
    .spacing(8)
    .into()
}

fn labeled<'a>(label: &'a str, input: TextInput<'a, Message>) -> Element<'a, Message> {
    row![text(label).size(14).width(Length::Fixed(90.0)), input]
        .spacing(10)
        .align_y(Alignment::Center)
        .into()
}

fn prompt_row(app: &RetouchStudio) -> Element<'_, Message> {
    let label = if app.busy { "处理中..." } else { "开始修图" };

    row![
        text_input("输入修图指令，例如：把天空换成晚霞", &app.prompt)
            .on_input(Message::PromptChanged)
            .on_submit(Message::Generate)
            .padding(10),
        button(text(label))
            .padding(10)
            .on_press_maybe((!app.busy).then_some(Message::Generate)),
    ]
    .spacing(10)
    .align_y(Alignment::Center)
    .into()
}
