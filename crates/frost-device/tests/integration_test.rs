
use chrono::Utc;
use frost_device::{Device, DeviceFilter, DeviceRegistry, DeviceStatus, LivenessMonitor};
use std::sync::Arc;

/// 测试设备从首次上报到失联的完整生命周期
#[tokio::test]
async fn test_device_lifecycle() {
    let db = Arc::new(test_helpers::create_test_db().await.unwrap());
    let registry = Arc::new(DeviceRegistry::new(db));

    // 1. 首次读数自动建档
    let device = registry.touch("coldroom-a-01", Utc::now()).await.unwrap();
    assert_eq!(device.id, "coldroom-a-01");
    assert_eq!(device.status, DeviceStatus::Online);

    // 2. 补充设备信息
    let mut device = registry.get("coldroom-a-01").await.unwrap().unwrap();
    device.name = "冷库 A 1号传感器".to_string();
    device.location = Some("冷库 A".to_string());
    registry.update("coldroom-a-01", device).await.unwrap();

    let device = registry.get("coldroom-a-01").await.unwrap().unwrap();
    assert_eq!(device.name, "冷库 A 1号传感器");

    // 3. 后续读数只刷新时间戳，不重复建档
    registry.touch("coldroom-a-01", Utc::now()).await.unwrap();
    assert_eq!(registry.count(DeviceFilter::default()).await.unwrap(), 1);
}

/// 测试失联巡检将超时设备标记为离线
#[tokio::test]
async fn test_liveness_sweep() {
    let db = Arc::new(test_helpers::create_test_db().await.unwrap());
    let registry = Arc::new(DeviceRegistry::new(db));
    let monitor = LivenessMonitor::new(registry.clone(), 3);

    // 一个失联设备、一个正常设备
    let stale_at = Utc::now() - chrono::Duration::minutes(90);
    registry.touch("coldroom-a-01", stale_at).await.unwrap();
    registry.touch("coldroom-b-01", Utc::now()).await.unwrap();

    let marked = LivenessMonitor::sweep(&registry, 3).await.unwrap();
    assert_eq!(marked, 1);

    let device = registry.get("coldroom-a-01").await.unwrap().unwrap();
    assert_eq!(device.status, DeviceStatus::Offline);

    // 失联设备同时出现在 connection_lost 判定输入中
    let stale = monitor.stale_devices().await.unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].id, "coldroom-a-01");
}

/// 测试显式注册与过滤查询
#[tokio::test]
async fn test_register_and_filter() {
    let db = Arc::new(test_helpers::create_test_db().await.unwrap());
    let registry = Arc::new(DeviceRegistry::new(db));

    for i in 1..=3 {
        let device = Device::new(format!("传感器{}", i), Some("冷库 B".to_string()));
        registry.register(device).await.unwrap();
    }

    let filter = DeviceFilter {
        search: Some("冷库 B".to_string()),
        ..Default::default()
    };
    let devices = registry.list(filter).await.unwrap();
    assert_eq!(devices.len(), 3);
}
