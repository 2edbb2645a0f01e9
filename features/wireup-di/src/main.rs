use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::EnvFilter;
use wireup_di::{
    Arguments, Artifact, Binding, ConfigProvider, ContainerBuilder, DynError, Injected, Module,
    Provider,
};

fn main() -> Result<(), DynError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let config = ConfigProvider::from_value(json!({
        "database": { "url": "postgres://localhost/app" },
        "container": { "init_timeout_ms": 5000 }
    }));

    let mut container = ContainerBuilder::new()
        .with_config(config)
        .options_from_config()?
        .add_artifact(
            Artifact::new(
                "src/database.rs",
                Provider::class(|arguments: Arguments| {
                    Ok(Database {
                        url: arguments.value(0)?,
                        connected: false,
                    })
                }),
            )
            .parameter(Binding::new("url").config("database.url"))
            .method("init"),
        )
        .add_artifact(
            Artifact::new(
                "src/user_service.rs",
                Provider::class(|_| {
                    Ok(UserService {
                        database: None,
                    })
                }),
            )
            .property(Binding::new("database").typed("Database")),
        )
        .add_artifact(
            Artifact::new(
                "src/greeting.rs",
                Provider::function(|arguments: Arguments| async move {
                    let service = arguments.instance::<UserService>(0)?;
                    let greeting: String = arguments.value(1)?;
                    Ok::<_, DynError>(format!("{greeting} from {}", service.describe()))
                }),
            )
            .parameter(Binding::new("userService").inject_by_convention())
            .parameter(Binding::new("greeting").literal("Hello")),
        )
        .build()?;

    futures::executor::block_on(container.ready())?;

    println!("{container:?}");
    println!("{:?}", container.completion_order());
    println!("{}", container.get_as::<String>("greeting")?);

    futures::executor::block_on(container.close())?;
    Ok(())
}

struct Database {
    url: String,
    connected: bool,
}
impl Module for Database {
    async fn init(&mut self) -> Result<(), DynError> {
        tracing::info!("Connecting to {}", self.url);
        self.connected = true;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), DynError> {
        tracing::info!("Disconnecting from {}", self.url);
        Ok(())
    }
}

struct UserService {
    database: Option<Arc<Database>>,
}
impl UserService {
    fn describe(&self) -> String {
        match &self.database {
            Some(database) if database.connected => format!("user service on {}", database.url),
            _ => "a disconnected user service".to_string(),
        }
    }
}
impl Module for UserService {
    fn set_property(&mut self, name: &str, value: Injected) -> Result<(), DynError> {
        match name {
            "database" => {
                self.database = Some(value.instance()?);
                Ok(())
            }
            _ => Err(wireup_di::InjectError::UnknownProperty(name.to_string()).into()),
        }
    }
}
