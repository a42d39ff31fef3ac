use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::DEFAULT_CULTURE_CODE;
use crate::store::keys::SINGLETON_USER_KEY;
use crate::store::{Store, StoreError};
use crate::vocabulary::repository::UserPreferences;
use crate::vocabulary::types::Topic;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    /// UI culture, e.g. `en-US`
    pub culture_code: String,
    /// Native language that words are translated into
    pub translation_language: String,
    pub favorite_topic: Topic,
    pub is_dialog_show_install_voice: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub translation_language: String,
    #[serde(default = "default_favorite_topic")]
    pub favorite_topic: String,
}

fn default_favorite_topic() -> String {
    Topic::Programming.as_str().to_string()
}

impl User {
    fn from_new(new_user: &NewUser, favorite_topic: Topic) -> Self {
        Self {
            id: Uuid::now_v7(),
            culture_code: DEFAULT_CULTURE_CODE.to_string(),
            translation_language: new_user.translation_language.trim().to_string(),
            favorite_topic,
            is_dialog_show_install_voice: false,
            created_at: Utc::now(),
        }
    }
}

fn user_not_found() -> StoreError {
    StoreError::NotFound {
        entity: "user".to_string(),
        key: String::from_utf8_lossy(SINGLETON_USER_KEY).into_owned(),
    }
}

fn parse_topic(raw: &str) -> Result<Topic, StoreError> {
    raw.parse::<Topic>()
        .map_err(|e| StoreError::Validation(e.to_string()))
}

fn require_non_empty(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

impl Store {
    pub fn any_user(&self) -> Result<bool, StoreError> {
        Ok(self.users.contains_key(SINGLETON_USER_KEY)?)
    }

    pub fn get_user(&self) -> Result<Option<User>, StoreError> {
        match self.users.get(SINGLETON_USER_KEY)? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    fn require_user(&self) -> Result<User, StoreError> {
        self.get_user()?.ok_or_else(user_not_found)
    }

    /// 创建唯一用户；已存在时不覆盖并返回 `false`
    pub fn save_user(&self, new_user: &NewUser) -> Result<bool, StoreError> {
        require_non_empty("translationLanguage", &new_user.translation_language)?;
        require_non_empty("favoriteTopic", &new_user.favorite_topic)?;
        let topic = parse_topic(&new_user.favorite_topic)?;

        let user = User::from_new(new_user, topic);
        let cas_result = self.users.compare_and_swap(
            SINGLETON_USER_KEY,
            None::<&[u8]>,
            Some(Self::serialize(&user)?),
        )?;

        Ok(cas_result.is_ok())
    }

    /// 没有用户时为 no-op
    pub fn remove_user(&self) -> Result<(), StoreError> {
        self.users.remove(SINGLETON_USER_KEY)?;
        Ok(())
    }

    fn update_user(&self, mutate: impl FnOnce(&mut User)) -> Result<User, StoreError> {
        let mut user = self.require_user()?;
        mutate(&mut user);
        self.users
            .insert(SINGLETON_USER_KEY, Self::serialize(&user)?)?;
        Ok(user)
    }

    pub fn set_user_culture(&self, culture: &str) -> Result<User, StoreError> {
        require_non_empty("culture", culture)?;
        let culture = culture.trim().to_string();
        self.update_user(|user| user.culture_code = culture)
    }

    pub fn set_user_native_language(&self, language: &str) -> Result<User, StoreError> {
        require_non_empty("nativeLanguage", language)?;
        let language = language.trim().to_string();
        self.update_user(|user| user.translation_language = language)
    }

    pub fn set_user_favorite_topic(&self, topic: &str) -> Result<User, StoreError> {
        require_non_empty("favoriteTopic", topic)?;
        let topic = parse_topic(topic)?;
        self.update_user(|user| user.favorite_topic = topic)
    }

    pub fn set_user_voice_dialog_shown(&self, shown: bool) -> Result<User, StoreError> {
        self.update_user(|user| user.is_dialog_show_install_voice = shown)
    }
}

#[async_trait]
impl UserPreferences for Store {
    async fn favorite_topic(&self) -> Result<Topic, StoreError> {
        Ok(self.require_user()?.favorite_topic)
    }

    async fn native_language(&self) -> Result<String, StoreError> {
        Ok(self.require_user()?.translation_language)
    }
}
