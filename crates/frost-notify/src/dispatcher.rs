use crate::message::NotifyMessage;
use crate::notifier::Notifier;
use crate::records::NotificationStore;
use crate::{Notification, NotifyChannel, NotifyError, Operator, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// 投递配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// 最大重试次数（不含首次尝试）
    pub max_retries: u32,

    /// 重试间隔（秒）
    pub retry_backoff_secs: u64,

    /// 单次渠道调用超时（秒），超时按失败重试
    pub send_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_secs: 5,
            send_timeout_secs: 10,
        }
    }
}

/// 一次投递请求
///
/// 通知记录必须已持久化为 pending 后才能入队，
/// 投递失败只更新通知记录，不回滚任何上游状态
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub notification: Notification,
    pub message: NotifyMessage,
}

/// 通知投递器
///
/// 后台 worker 消费队列，逐条投递并维护通知记录状态。
/// 入队与投递解耦，慢渠道不会阻塞读数摄取路径。
pub struct NotifyDispatcher {
    /// 通知记录存储
    records: Arc<NotificationStore>,

    /// 渠道 -> 通知器
    notifiers: Arc<RwLock<HashMap<NotifyChannel, Arc<dyn Notifier>>>>,

    /// 投递配置
    config: DispatchConfig,

    /// 投递队列发送端
    tx: mpsc::UnboundedSender<DispatchRequest>,

    /// 投递队列接收端（start 时被 worker 取走）
    rx: Mutex<Option<mpsc::UnboundedReceiver<DispatchRequest>>>,

    /// 是否正在运行
    running: Arc<RwLock<bool>>,
}

impl NotifyDispatcher {
    /// 创建新的投递器
    pub fn new(records: Arc<NotificationStore>, config: DispatchConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            records,
            notifiers: Arc::new(RwLock::new(HashMap::new())),
            config,
            tx,
            rx: Mutex::new(Some(rx)),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// 注册通知器
    pub async fn register(&self, channel: NotifyChannel, notifier: Arc<dyn Notifier>) {
        let mut notifiers = self.notifiers.write().await;
        info!("Registered notifier: {}", notifier.name());
        notifiers.insert(channel, notifier);
    }

    /// 启动投递 worker
    pub async fn start(&self) {
        let mut running = self.running.write().await;
        if *running {
            warn!("Notify dispatcher is already running");
            return;
        }
        *running = true;
        drop(running);

        let mut rx = match self.rx.lock().await.take() {
            Some(rx) => rx,
            None => {
                warn!("Dispatch queue receiver already taken");
                return;
            }
        };

        let records = self.records.clone();
        let notifiers = self.notifiers.clone();
        let config = self.config.clone();
        let running = self.running.clone();

        info!(
            max_retries = config.max_retries,
            send_timeout_secs = config.send_timeout_secs,
            "Notify dispatcher started"
        );

        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let is_running = *running.read().await;
                if !is_running {
                    info!("Notify dispatcher stopped");
                    break;
                }

                Self::deliver(&records, &notifiers, &config, request).await;
            }
        });
    }

    /// 停止投递 worker
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        info!("Notify dispatcher stopping...");
    }

    /// 将已登记的通知加入投递队列
    pub fn enqueue(&self, request: DispatchRequest) -> Result<()> {
        self.tx
            .send(request)
            .map_err(|_| NotifyError::delivery("Dispatch queue closed"))
    }

    /// 向一组值班员广播消息
    ///
    /// 为每个（值班员, 可用渠道）登记一条通知并入队；
    /// 返回实际入队的通知记录
    pub async fn broadcast(
        &self,
        operators: &[Operator],
        message: &NotifyMessage,
    ) -> Result<Vec<Notification>> {
        let mut queued = Vec::new();

        for operator in operators {
            for (channel, address) in operator.channels() {
                let notification =
                    Notification::new(operator.id.clone(), channel, address);
                let notification = self.records.insert(notification).await?;
                self.enqueue(DispatchRequest {
                    notification: notification.clone(),
                    message: message.clone(),
                })?;
                queued.push(notification);
            }
        }

        debug!(count = queued.len(), "Broadcast queued");
        Ok(queued)
    }

    // ========== 私有辅助方法 ==========

    /// 投递一条通知，带超时与有界重试
    async fn deliver(
        records: &NotificationStore,
        notifiers: &RwLock<HashMap<NotifyChannel, Arc<dyn Notifier>>>,
        config: &DispatchConfig,
        request: DispatchRequest,
    ) {
        let mut notification = request.notification;

        let notifier = {
            let notifiers = notifiers.read().await;
            match notifiers.get(&notification.channel) {
                Some(n) if n.is_enabled() => n.clone(),
                _ => {
                    warn!(
                        notification_id = %notification.id,
                        channel = %notification.channel.as_str(),
                        "No notifier configured for channel"
                    );
                    if let Err(e) = records
                        .mark_failed(&notification.id, "Channel not configured", 0)
                        .await
                    {
                        error!(error = %e, "Failed to record notification failure");
                    }
                    return;
                }
            }
        };

        loop {
            let outcome = tokio::time::timeout(
                Duration::from_secs(config.send_timeout_secs),
                notifier.send(&notification.address, &request.message),
            )
            .await;

            let failure = match outcome {
                Ok(Ok(result)) if result.success => None,
                Ok(Ok(result)) => Some(result.message),
                Ok(Err(e)) => Some(e.to_string()),
                Err(_) => Some(format!(
                    "Delivery timed out after {}s",
                    config.send_timeout_secs
                )),
            };

            match failure {
                None => {
                    if let Err(e) = records.mark_sent(&notification.id).await {
                        error!(error = %e, "Failed to record notification success");
                    }
                    debug!(
                        notification_id = %notification.id,
                        channel = %notifier.name(),
                        "Notification sent"
                    );
                    return;
                }
                Some(reason) => {
                    notification.retry_count += 1;
                    if notification.retry_count as u32 > config.max_retries {
                        error!(
                            notification_id = %notification.id,
                            channel = %notifier.name(),
                            error = %reason,
                            "Notification failed permanently"
                        );
                        if let Err(e) = records
                            .mark_failed(&notification.id, &reason, notification.retry_count)
                            .await
                        {
                            error!(error = %e, "Failed to record notification failure");
                        }
                        return;
                    }

                    warn!(
                        notification_id = %notification.id,
                        retry = notification.retry_count,
                        error = %reason,
                        "Notification delivery failed, retrying"
                    );
                    if let Err(e) = records
                        .mark_retry(&notification.id, &reason, notification.retry_count)
                        .await
                    {
                        error!(error = %e, "Failed to record notification retry");
                    }
                    tokio::time::sleep(Duration::from_secs(config.retry_backoff_secs)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NotifyResult;
    use crate::NotificationStatus;
    use async_trait::async_trait;
    use sea_orm::{ConnectionTrait, Database, Statement};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// 前 N 次调用失败的测试通知器
    struct FlakyNotifier {
        fail_first: u32,
        calls: AtomicU32,
    }

    impl FlakyNotifier {
        fn new(fail_first: u32) -> Self {
            Self {
                fail_first,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn send(&self, _address: &str, _message: &NotifyMessage) -> anyhow::Result<NotifyResult> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Ok(NotifyResult::failure("simulated failure"))
            } else {
                Ok(NotifyResult::success())
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    async fn create_test_records() -> Arc<NotificationStore> {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        db.execute(Statement::from_string(
            db.get_database_backend(),
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                incident_id TEXT,
                alert_id TEXT,
                operator_id TEXT NOT NULL,
                channel TEXT NOT NULL,
                address TEXT NOT NULL,
                status TEXT NOT NULL,
                retry_count INTEGER NOT NULL,
                error TEXT,
                sent_at TEXT,
                delivered_at TEXT,
                read_at TEXT,
                created_at TEXT NOT NULL
            )
            "#
            .to_string(),
        ))
        .await
        .unwrap();

        Arc::new(NotificationStore::new(Arc::new(db)))
    }

    fn fast_config() -> DispatchConfig {
        DispatchConfig {
            max_retries: 2,
            retry_backoff_secs: 0,
            send_timeout_secs: 5,
        }
    }

    async fn queued_notification(records: &NotificationStore) -> Notification {
        let n = Notification::new(
            "op_1".to_string(),
            NotifyChannel::Email,
            "a@example.com".to_string(),
        );
        records.insert(n).await.unwrap()
    }

    #[tokio::test]
    async fn test_successful_delivery_marks_sent() {
        let records = create_test_records().await;
        let dispatcher = NotifyDispatcher::new(records.clone(), fast_config());
        dispatcher
            .register(NotifyChannel::Email, Arc::new(FlakyNotifier::new(0)))
            .await;
        dispatcher.start().await;

        let n = queued_notification(&records).await;
        dispatcher
            .enqueue(DispatchRequest {
                notification: n.clone(),
                message: NotifyMessage::warning("test", "body"),
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        let n = records.get(&n.id).await.unwrap().unwrap();
        assert_eq!(n.status, NotificationStatus::Sent);
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let records = create_test_records().await;
        let dispatcher = NotifyDispatcher::new(records.clone(), fast_config());
        dispatcher
            .register(NotifyChannel::Email, Arc::new(FlakyNotifier::new(1)))
            .await;
        dispatcher.start().await;

        let n = queued_notification(&records).await;
        dispatcher
            .enqueue(DispatchRequest {
                notification: n.clone(),
                message: NotifyMessage::warning("test", "body"),
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;

        let n = records.get(&n.id).await.unwrap().unwrap();
        assert_eq!(n.status, NotificationStatus::Sent);
        assert_eq!(n.retry_count, 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_mark_failed() {
        let records = create_test_records().await;
        let dispatcher = NotifyDispatcher::new(records.clone(), fast_config());
        // 永远失败
        dispatcher
            .register(NotifyChannel::Email, Arc::new(FlakyNotifier::new(u32::MAX)))
            .await;
        dispatcher.start().await;

        let n = queued_notification(&records).await;
        dispatcher
            .enqueue(DispatchRequest {
                notification: n.clone(),
                message: NotifyMessage::warning("test", "body"),
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;

        let n = records.get(&n.id).await.unwrap().unwrap();
        assert_eq!(n.status, NotificationStatus::Failed);
        // max_retries=2：首次 + 两次重试后放弃
        assert_eq!(n.retry_count, 3);
        assert!(n.error.is_some());
    }

    #[tokio::test]
    async fn test_broadcast_records_per_channel() {
        let records = create_test_records().await;
        let dispatcher = NotifyDispatcher::new(records.clone(), fast_config());

        let mut op = crate::Operator::new("zhang".to_string(), 1);
        op.email = Some("zhang@example.com".to_string());
        op.telegram_chat_id = Some("123456".to_string());

        // 邮件 + Telegram 各登记一条
        let queued = dispatcher
            .broadcast(&[op], &NotifyMessage::info("notice", "body"))
            .await
            .unwrap();
        assert_eq!(queued.len(), 2);
        for n in &queued {
            assert_eq!(
                records.get(&n.id).await.unwrap().unwrap().status,
                NotificationStatus::Pending
            );
        }
    }

    #[tokio::test]
    async fn test_missing_channel_marks_failed() {
        let records = create_test_records().await;
        let dispatcher = NotifyDispatcher::new(records.clone(), fast_config());
        dispatcher.start().await;

        let n = queued_notification(&records).await;
        dispatcher
            .enqueue(DispatchRequest {
                notification: n.clone(),
                message: NotifyMessage::warning("test", "body"),
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        let n = records.get(&n.id).await.unwrap().unwrap();
        assert_eq!(n.status, NotificationStatus::Failed);
    }
}
