//! 会话事件推送
//! UI 层订阅这些事件来展示通知并跳转到登录页

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// 会话过期时展示给用户的提示
pub const SESSION_EXPIRED_MESSAGE: &str = "会话已过期，请重新登录";

/// 会话事件类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// 登录成功
    LoggedIn { user_id: String },
    /// 访问令牌已刷新
    TokenRefreshed,
    /// 会话终止（刷新失败）
    Expired { message: String },
    /// 跳转到登录入口
    RedirectToLogin { path: String },
    /// 主动登出
    LoggedOut,
}

impl SessionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::LoggedIn { .. } => "logged_in",
            SessionEvent::TokenRefreshed => "token_refreshed",
            SessionEvent::Expired { .. } => "expired",
            SessionEvent::RedirectToLogin { .. } => "redirect_to_login",
            SessionEvent::LoggedOut => "logged_out",
        }
    }
}

/// 带时间戳的事件
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub event: SessionEvent,
    pub occurred_at: DateTime<Utc>,
}

/// 事件总线
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// 创建新的事件总线
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 发布事件；没有订阅者不算错误
    pub fn publish(&self, event: SessionEvent) {
        let event_type = event.event_type();
        let envelope = EventEnvelope {
            event,
            occurred_at: Utc::now(),
        };
        if self.sender.send(envelope).is_err() {
            debug!(event_type, "No subscribers for session event");
        }
    }

    /// 订阅事件
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// 会话终止：立即通知，延迟后要求跳转登录页
    pub fn session_expired(&self, login_path: &str, redirect_delay: Duration) {
        self.publish(SessionEvent::Expired {
            message: SESSION_EXPIRED_MESSAGE.to_string(),
        });

        let bus = self.clone();
        let path = login_path.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(redirect_delay).await;
            bus.publish(SessionEvent::RedirectToLogin { path });
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
