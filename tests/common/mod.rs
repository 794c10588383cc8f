#![allow(dead_code)]

pub mod temp_files {
    use std::io::Write;

    use tempfile::NamedTempFile;

    /// Route table in a temp file whose extension selects the parser.
    pub fn create_temp_table(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("routeforge_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_temp_table(content, "yaml")
    }
}

pub mod fixtures {
    use std::sync::Arc;

    use routeforge::config::{DispatchConfig, RouteTable};
    use routeforge::dispatcher::Dispatcher;
    use routeforge::echo::echo_handler;
    use routeforge::registry::HandlerTable;
    use routeforge::router::Router;

    pub const BEAN_TABLE: &str = r#"
prefix: /api
routes:
  - handler: BeanController#beans
    paths: [/beans]
    return_type: List<String>
  - handler: BeanController#bean
    paths: ["/beans/{name}"]
    methods: [GET]
  - handler: BeanController#beanText
    paths: ["/beans/{name}/text"]
    methods: [GET]
    returns: text
  - handler: BeanController#deleteBean
    paths: ["/beans/{name}"]
    methods: [DELETE]
    returns: void
  - handler: UserController#anyUser
    paths: ["/users/*"]
  - handler: UserController#user
    paths: ["/users/{id}"]
"#;

    /// Router with the bean table registered, implemented by echo handlers.
    pub fn bean_router(config: &DispatchConfig) -> (Arc<Router>, HandlerTable) {
        let table = RouteTable::from_yaml_str(BEAN_TABLE).unwrap();
        let router = config.router(Arc::new(config.negotiation_manager()));
        let handlers = HandlerTable::from_route_table(&table, &router, echo_handler).unwrap();
        (Arc::new(router), handlers)
    }

    pub fn bean_dispatcher(config: &DispatchConfig) -> Dispatcher {
        let (router, handlers) = bean_router(config);
        config.dispatcher(router, Arc::new(handlers))
    }
}
