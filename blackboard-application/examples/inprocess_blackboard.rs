/// 进程内黑板示例
/// 演示本地回调订阅、远端描述订阅、持久化与管理命令
use anyhow::Result;
use blackboard_application::contract::RemoteBlackboardService;
use blackboard_application::wrapper::ReceiveHandler;
use blackboard_application::{BlackboardWrapper, InProcessTransport, RemoteBlackboard};
use blackboard_domain::eventing::BlackboardConfig;
use blackboard_domain::model::{Command, CommandId, Event, EventTypes, TypeFilter};
use blackboard_domain::persist::{EventRepository, InMemoryEventRepository};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let transport = Arc::new(InProcessTransport::new(Uuid::new_v4()));
    let repository = Arc::new(InMemoryEventRepository::new());
    let wrapper = BlackboardWrapper::new(
        transport.clone(),
        repository.clone(),
        BlackboardConfig::builder().service_name("DemoBlackboard").build(),
    );
    let host = wrapper.host_id();

    // 本地回调订阅
    let handler: ReceiveHandler = Arc::new(|event: Event| {
        println!("[local] {} -> {}", event.event_type(), event.ext_data());
    });
    let local = wrapper.subscribe(
        Arc::new(
            TypeFilter::builder()
                .host(host)
                .types(EventTypes::One("UserEvent".into()))
                .build(),
        ),
        Some(handler),
    )?;

    // 远端订阅：仅传递通道描述
    let remote = RemoteBlackboard::new(wrapper.core().clone());
    let (sender, receiver) = transport.create_channel_pair();
    let description = transport.expose(sender);
    let remote_cookie = Uuid::new_v4();
    remote.subscribe(
        Arc::new(
            TypeFilter::builder()
                .host(remote.host_id())
                .types(EventTypes::All)
                .build(),
        ),
        Some(description),
        remote_cookie,
    )?;

    let subject = Uuid::new_v4();
    wrapper.publish_event(
        Event::builder()
            .event_type("UserEvent")
            .event_subject(subject)
            .source_computer(host)
            .ext_data(json!({ "name": "alice" }))
            .publish_to_database(true)
            .build(),
    )?;
    wrapper.publish_event(Event::builder().event_type("SystemEvent").build())?;

    let mut receiver = receiver;
    for _ in 0..2 {
        if let Some(event) = receiver.recv().await {
            println!("[remote] {}", event.event_type());
        }
    }

    if let Err(err) =
        wrapper.execute_command(Command::new(CommandId::from_uuid(Uuid::new_v4()), json!({})))
    {
        println!("command rejected: {err}");
    }

    remote.unsubscribe(remote_cookie)?;
    wrapper.unsubscribe(local.cookie)?;
    wrapper.shutdown().await;

    println!("stored events for subject: {}", repository.events_for(subject).await?.len());
    Ok(())
}
