/// 用户设置相关的输入校验，供用户路由共用。
use crate::constants::MAX_LEARNED_PAGE;
use crate::vocabulary::{Language, Topic};

/// 界面语言：必须是受支持的 culture code，如 `uk-UA`
pub fn validate_culture(code: &str) -> Result<Language, &'static str> {
    if code.trim().is_empty() {
        return Err("culture 不能为空");
    }
    Language::from_culture_code(code).ok_or("不支持的 culture code")
}

/// 翻译目标语言；English 表示不翻译
pub fn validate_native_language(code: &str) -> Result<Language, &'static str> {
    if code.trim().is_empty() {
        return Err("母语不能为空");
    }
    Language::from_culture_code(code).ok_or("不支持的母语")
}

pub fn validate_topic(raw: &str) -> Result<Topic, &'static str> {
    if raw.trim().is_empty() {
        return Err("主题不能为空");
    }
    raw.parse::<Topic>().map_err(|_| "未知的主题")
}

/// 学习记录页码从 1 开始，不超过 [`MAX_LEARNED_PAGE`]
pub fn validate_page(page: usize) -> Result<usize, &'static str> {
    if page < 1 {
        return Err("页码必须大于等于 1");
    }
    if page > MAX_LEARNED_PAGE {
        return Err("页码超出范围");
    }
    Ok(page)
}
