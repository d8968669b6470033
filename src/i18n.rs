use std::fmt::Display;
use std::sync::{Mutex, MutexGuard};

use lazy_static::lazy_static;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    En,
    Zh,
}

lazy_static! {
    static ref CURRENT_LANG: Mutex<Language> = Mutex::new(Language::En);
}

fn current() -> MutexGuard<'static, Language> {
    // A poisoned lock still holds a valid language.
    CURRENT_LANG.lock().unwrap_or_else(|e| e.into_inner())
}

pub fn set_language(lang: Language) {
    *current() = lang;
}

pub fn get_language() -> Language {
    *current()
}

pub fn t(key: &str) -> String {
    let lang = get_language();
    let val = match lang {
        Language::En => get_en(key),
        Language::Zh => get_zh(key),
    };
    if val.is_empty() {
        key.to_string()
    } else {
        val.to_string()
    }
}

/// Like [`t`], with the first `{}` in the message replaced by `arg`.
pub fn t_with(key: &str, arg: impl Display) -> String {
    t(key).replacen("{}", &arg.to_string(), 1)
}

fn get_zh(key: &str) -> &'static str {
    match key {
        "loading" => "正在加载...",
        "scanning" => "正在检测静音...",
        "busy" => "检测仍在进行中",
        "zero_length" => "音频长度为零",
        "too_large" => "音频过长，无法分析",
        "out_of_memory" => "音频过大，内存不足",
        "read_failure" => "读取音频失败",
        "bad_channels" => "不支持的声道数",
        "no_sound_in" => "开头未检测到声音",
        "no_sound_out" => "结尾未检测到声音",
        "loop_in_set" => "循环起点设置在第 {} 个采样",
        "loop_out_set" => "循环终点设置在第 {} 个采样",
        "invalid_threshold" => "阈值必须为 1 到 99 之间的整数",
        "invalid_position" => "无效的时间",
        "playing" => "正在播放... (Ctrl+C 停止)",
        _ => "",
    }
}

fn get_en(key: &str) -> &'static str {
    match key {
        "loading" => "Loading...",
        "scanning" => "Detecting silence...",
        "busy" => "Silence detection is still running",
        "zero_length" => "Audio length is zero",
        "too_large" => "Audio is too long to analyze",
        "out_of_memory" => "Audio is too large to fit in memory",
        "read_failure" => "Failed to read audio",
        "bad_channels" => "Unsupported channel count",
        "no_sound_in" => "No sound found at the start",
        "no_sound_out" => "No sound found at the end",
        "loop_in_set" => "Loop in set at sample {}",
        "loop_out_set" => "Loop out set at sample {}",
        "invalid_threshold" => "Threshold must be a whole number from 1 to 99",
        "invalid_position" => "Invalid time",
        "playing" => "Playing... (Ctrl+C to stop)",
        _ => "",
    }
}
