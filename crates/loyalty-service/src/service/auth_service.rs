//! 认证服务
//!
//! 注册与登录成功后都签发会话 Token

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::auth::{JwtManager, hash_password, verify_password};
use crate::error::{LoyaltyError, Result};
use crate::repository::UserRepositoryTrait;

pub struct AuthService<UR>
where
    UR: UserRepositoryTrait + ?Sized,
{
    user_repo: Arc<UR>,
    jwt: JwtManager,
    bcrypt_cost: u32,
}

impl<UR> AuthService<UR>
where
    UR: UserRepositoryTrait + ?Sized,
{
    pub fn new(user_repo: Arc<UR>, jwt: JwtManager) -> Self {
        Self {
            user_repo,
            jwt,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// 调整密码哈希强度（测试中使用最低强度）
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    /// 注册新用户并签发 Token
    #[instrument(skip(self, password))]
    pub async fn register(&self, login: &str, password: &str) -> Result<String> {
        let password_hash = hash_password(password, self.bcrypt_cost)?;

        let user = self
            .user_repo
            .create_user(login, &password_hash)
            .await?
            .ok_or_else(|| LoyaltyError::LoginTaken(login.to_string()))?;

        info!(user_id = user.id, "用户注册成功");

        let (token, _) = self.jwt.generate_token(user.id, &user.login)?;
        Ok(token)
    }

    /// 校验凭据并签发 Token
    #[instrument(skip(self, password))]
    pub async fn login(&self, login: &str, password: &str) -> Result<String> {
        let Some(user) = self.user_repo.find_by_login(login).await? else {
            warn!("登录失败：用户不存在");
            return Err(LoyaltyError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "登录失败：密码错误");
            return Err(LoyaltyError::InvalidCredentials);
        }

        let (token, _) = self.jwt.generate_token(user.id, &user.login)?;
        Ok(token)
    }
}
