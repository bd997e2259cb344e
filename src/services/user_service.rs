//! 用户管理服务：列表、创建、修改、删除、个人资料

use tracing::{info, warn};

use crate::{
    auth::AuthClient,
    error::ClientError,
    models::user::*,
    transport::RequestSpec,
};

pub struct UserService {
    client: AuthClient,
}

impl UserService {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    /// 当前登录用户
    fn acting_user(&self) -> Result<SessionUser, ClientError> {
        self.client
            .session()
            .current_user()
            .ok_or(ClientError::NotLoggedIn)
    }

    /// 列出所有用户（管理员或经理）
    pub async fn list_users(&self) -> Result<Vec<SessionUser>, ClientError> {
        let actor = self.acting_user()?;
        if !actor.role.can_list_users() {
            warn!(user_id = %actor.id, role = %actor.role, "Permission denied: list users");
            return Err(ClientError::Forbidden(
                "You are not allowed to view all users".to_string(),
            ));
        }

        let response = self
            .client
            .request(RequestSpec::get("/users"))
            .await?
            .error_for_status()?;

        response.json()
    }

    /// 创建用户（仅管理员）
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<SessionUser, ClientError> {
        let actor = self.acting_user()?;
        if !actor.role.can_create_users() {
            warn!(user_id = %actor.id, role = %actor.role, "Permission denied: create user");
            return Err(ClientError::Forbidden(
                "Only administrators can create users".to_string(),
            ));
        }

        let response = self
            .client
            .request(RequestSpec::post("/users").json(&req)?)
            .await?
            .error_for_status()?;

        let user: SessionUser = response.json()?;
        info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// 修改用户
    ///
    /// 只有管理员可以修改角色；经理不能修改管理员；
    /// 非管理员修改密码时必须提供当前密码。
    pub async fn update_user(
        &self,
        target: &SessionUser,
        patch: UpdateUserRequest,
    ) -> Result<(), ClientError> {
        let actor = self.acting_user()?;
        let patch = Self::authorize_patch(&actor, target.role, patch)?;

        self.client
            .request(RequestSpec::patch(format!("/users/{}", target.id)).json(&patch)?)
            .await?
            .error_for_status()?;

        info!(user_id = %target.id, actor = %actor.id, "User updated");
        Ok(())
    }

    /// 删除用户（仅管理员）
    pub async fn delete_user(&self, id: &str) -> Result<(), ClientError> {
        let actor = self.acting_user()?;
        if !actor.role.can_delete_users() {
            warn!(user_id = %actor.id, role = %actor.role, "Permission denied: delete user");
            return Err(ClientError::Forbidden(
                "You are not allowed to delete users".to_string(),
            ));
        }

        self.client
            .request(RequestSpec::delete(format!("/users/{}", id)))
            .await?
            .error_for_status()?;

        info!(user_id = %id, actor = %actor.id, "User deleted");
        Ok(())
    }

    /// 更新个人资料，成功后同步本地缓存的用户信息
    pub async fn update_profile(
        &self,
        name: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<SessionUser, ClientError> {
        let mut me = self.acting_user()?;

        let patch = UpdateUserRequest {
            name: name.clone(),
            email: email.clone(),
            password,
            ..Default::default()
        };

        self.client
            .request(RequestSpec::patch(format!("/users/{}", me.id)).json(&patch)?)
            .await?
            .error_for_status()?;

        if let Some(name) = name {
            me.name = name;
        }
        if let Some(email) = email {
            me.email = email;
        }
        self.client.session().update_user(&me)?;

        info!(user_id = %me.id, "Profile updated");
        Ok(me)
    }

    fn authorize_patch(
        actor: &SessionUser,
        target_role: Role,
        mut patch: UpdateUserRequest,
    ) -> Result<UpdateUserRequest, ClientError> {
        if !actor.role.can_edit_user(target_role) {
            warn!(user_id = %actor.id, role = %actor.role, "Permission denied: edit administrator");
            return Err(ClientError::Forbidden(
                "Managers cannot edit administrators".to_string(),
            ));
        }

        if patch.role.is_some() && !actor.role.can_assign_roles() {
            return Err(ClientError::Forbidden(
                "Only administrators can change roles".to_string(),
            ));
        }

        if actor.role == Role::Admin {
            // 管理员重置密码不需要当前密码
            patch.current_password = None;
        } else if patch.password.is_some() && patch.current_password.is_none() {
            return Err(ClientError::InvalidRequest(
                "Current password is required to change the password".to_string(),
            ));
        }

        Ok(patch)
    }
}
