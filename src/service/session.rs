use crate::models::Account;
use dashmap::DashMap;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

/// 通知通道容量
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// 会话变化通知: 登录时 account 为 Some, 退出时为 None
#[derive(Debug, Clone, PartialEq)]
pub struct SessionChange {
    pub token: Uuid,
    pub account_id: Uuid,
    pub account: Option<Account>,
}

/// 进程内会话表, 变化通过 broadcast 推送给订阅者
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, Account>,
    changes: broadcast::Sender<SessionChange>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            sessions: DashMap::new(),
            changes,
        }
    }

    /// 新建会话, 返回令牌
    pub fn open(&self, account: Account) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.insert(token, account.clone());
        self.notify(SessionChange {
            token,
            account_id: account.id,
            account: Some(account),
        });
        token
    }

    /// 关闭会话, 令牌不存在时不发通知
    pub fn close(&self, token: &Uuid) -> Option<Account> {
        let (token, account) = self.sessions.remove(token)?;
        self.notify(SessionChange {
            token,
            account_id: account.id,
            account: None,
        });
        Some(account)
    }

    pub fn current(&self, token: &Uuid) -> Option<Account> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    /// 账号是否仍有其他在线会话
    pub fn is_signed_in(&self, account_id: &Uuid) -> bool {
        self.sessions.iter().any(|entry| entry.value().id == *account_id)
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.changes.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn notify(&self, change: SessionChange) {
        // 没有订阅者时 send 返回 Err, 忽略即可
        let _ = self.changes.send(change);
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 订阅端收到的事件
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Changed(SessionChange),
    /// 订阅者处理太慢, 中间若干条通知已丢失
    Lagged(u64),
}

/// 会话变化订阅, drop 即退订
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionChange>,
}

impl SessionSubscription {
    /// 等待下一条事件 (含丢失提示), 通道关闭后返回 None
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        match self.receiver.recv().await {
            Ok(change) => Some(SessionEvent::Changed(change)),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("session listener lagged, {} notifications skipped", skipped);
                Some(SessionEvent::Lagged(skipped))
            }
            Err(RecvError::Closed) => None,
        }
    }

    /// 等待下一条通知, 跳过丢失提示
    pub async fn next(&mut self) -> Option<SessionChange> {
        loop {
            match self.next_event().await? {
                SessionEvent::Changed(change) => return Some(change),
                SessionEvent::Lagged(_) => {}
            }
        }
    }

    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(email: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username: email.to_string(),
        }
    }

    #[tokio::test]
    async fn subscribers_see_sign_in_then_sign_out() {
        let registry = SessionRegistry::new();
        let mut subscription = registry.subscribe();
        let owner = account("owner@example.com");

        let token = registry.open(owner.clone());
        assert_eq!(registry.current(&token), Some(owner.clone()));

        let signed_in = subscription.next().await.unwrap();
        assert_eq!(signed_in.token, token);
        assert_eq!(signed_in.account, Some(owner.clone()));

        assert_eq!(registry.close(&token), Some(owner.clone()));
        let signed_out = subscription.next().await.unwrap();
        assert_eq!(signed_out.account_id, owner.id);
        assert_eq!(signed_out.account, None);

        assert_eq!(registry.current(&token), None);
        assert!(!registry.is_signed_in(&owner.id));
    }

    #[tokio::test]
    async fn slow_subscriber_is_told_it_lagged() {
        let registry = SessionRegistry::new();
        let mut subscription = registry.subscribe();

        let overflow = 3;
        for i in 0..CHANGE_CHANNEL_CAPACITY + overflow {
            registry.open(account(&format!("user{}@example.com", i)));
        }

        assert_eq!(subscription.next_event().await, Some(SessionEvent::Lagged(overflow as u64)));
        assert!(matches!(subscription.next_event().await, Some(SessionEvent::Changed(_))));
    }

    #[test]
    fn closing_unknown_token_is_silent() {
        let registry = SessionRegistry::new();
        let mut subscription = registry.subscribe();

        assert!(registry.close(&Uuid::new_v4()).is_none());
        assert!(subscription.receiver.try_recv().is_err());
    }

    #[test]
    fn dropping_subscription_tears_it_down() {
        let registry = SessionRegistry::new();
        let first = registry.subscribe();
        let second = registry.subscribe();
        assert_eq!(registry.subscriber_count(), 2);

        first.unsubscribe();
        drop(second);
        assert_eq!(registry.subscriber_count(), 0);

        // 无订阅者时登录不受影响
        let token = registry.open(account("late@example.com"));
        assert!(registry.current(&token).is_some());
    }

    #[test]
    fn second_session_keeps_account_signed_in() {
        let registry = SessionRegistry::new();
        let owner = account("two-tabs@example.com");
        let a = registry.open(owner.clone());
        let _b = registry.open(owner.clone());

        registry.close(&a);
        assert!(registry.is_signed_in(&owner.id));
    }
}
