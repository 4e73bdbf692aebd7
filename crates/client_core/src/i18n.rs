//! User-facing strings for the two supported locales.

use shared::domain::Language;

pub struct Messages {
    pub stop: &'static str,
    pub stop_all: &'static str,
    pub rendering: &'static str,
    pub frame: &'static str,
    pub continuing: &'static str,
    pub style_label: &'static str,
    pub script_failed: &'static str,
    pub enhancement_failed: &'static str,
    pub no_images_to_download: &'static str,
    pub failed_to_export: &'static str,
    pub edit_failed: &'static str,
    pub key_missing: &'static str,
    pub key_saved: &'static str,
    pub key_cleared: &'static str,
    pub exported: &'static str,
}

static EN: Messages = Messages {
    stop: "Stop",
    stop_all: "Stop All",
    rendering: "Rendering",
    frame: "frame",
    continuing: "Continuing...",
    style_label: "Style:",
    script_failed: "Failed to generate script. Please try again or check your API key connection.",
    enhancement_failed: "Enhancement failed. Check your API key.",
    no_images_to_download: "No images to download.",
    failed_to_export: "Failed to export images.",
    edit_failed: "Failed to edit image. Try a different prompt.",
    key_missing: "API Key not found. Please set it in settings or via the environment.",
    key_saved: "API key saved.",
    key_cleared: "Stored API key removed.",
    exported: "Exported",
};

static ZH: Messages = Messages {
    stop: "停止",
    stop_all: "全部停止",
    rendering: "正在渲染",
    frame: "画面",
    continuing: "正在续写...",
    style_label: "风格：",
    script_failed: "脚本生成失败。请重试或检查 API Key 连接。",
    enhancement_failed: "优化失败。请检查 API Key。",
    no_images_to_download: "没有可下载的图片。",
    failed_to_export: "导出图片失败。",
    edit_failed: "编辑失败。请尝试不同的提示词。",
    key_missing: "未找到 API Key。请在设置中或通过环境变量提供。",
    key_saved: "API Key 已保存。",
    key_cleared: "已删除保存的 API Key。",
    exported: "已导出",
};

pub fn messages(language: Language) -> &'static Messages {
    match language {
        Language::En => &EN,
        Language::Zh => &ZH,
    }
}

/// Picks the locale from `LC_ALL`, `LC_MESSAGES` or `LANG`, first one set wins.
pub fn detect_language() -> Language {
    let locale = ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty());
    language_for_locale(locale.as_deref())
}

pub fn language_for_locale(locale: Option<&str>) -> Language {
    match locale {
        Some(value) if value.to_ascii_lowercase().starts_with("zh") => Language::Zh,
        _ => Language::En,
    }
}
