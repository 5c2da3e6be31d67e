#![allow(dead_code)]

pub mod test_tracing {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::{EnvFilter, Registry};

    /// Thread-local subscriber writing through the test harness capture.
    pub struct TestTracing {
        _guard: tracing::subscriber::DefaultGuard,
    }

    impl TestTracing {
        pub fn init() -> Self {
            let subscriber = Registry::default()
                .with(EnvFilter::new("mvcore=debug"))
                .with(tracing_subscriber::fmt::layer().with_test_writer());
            Self {
                _guard: tracing::subscriber::set_default(subscriber),
            }
        }
    }
}

pub mod services {
    use mvcore::container::Container;
    use mvcore::http::{
        AesCrypt, BasicFilter, Crypt, CryptError, Filter, MemorySession, Request,
        ResponseCookies, Session,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub const PASSPHRASE: &str = "test-passphrase";

    /// Crypt wrapper counting how often each direction is used.
    pub struct CountingCrypt {
        inner: AesCrypt,
        pub encrypts: AtomicUsize,
        pub decrypts: AtomicUsize,
    }

    impl CountingCrypt {
        pub fn new() -> Self {
            Self {
                inner: AesCrypt::from_passphrase(PASSPHRASE).unwrap(),
                encrypts: AtomicUsize::new(0),
                decrypts: AtomicUsize::new(0),
            }
        }

        pub fn decrypts(&self) -> usize {
            self.decrypts.load(Ordering::SeqCst)
        }

        pub fn encrypts(&self) -> usize {
            self.encrypts.load(Ordering::SeqCst)
        }
    }

    impl Crypt for CountingCrypt {
        fn encrypt_base64(&self, plaintext: &str) -> Result<String, CryptError> {
            self.encrypts.fetch_add(1, Ordering::SeqCst);
            self.inner.encrypt_base64(plaintext)
        }

        fn decrypt_base64(&self, encoded: &str) -> Result<String, CryptError> {
            self.decrypts.fetch_add(1, Ordering::SeqCst);
            self.inner.decrypt_base64(encoded)
        }
    }

    /// Handles to everything registered by [`cookie_services`].
    pub struct Harness {
        pub container: Arc<Container>,
        pub request: Arc<Request>,
        pub response: Arc<ResponseCookies>,
        pub session: Arc<MemorySession>,
        pub crypt: Arc<CountingCrypt>,
    }

    impl Harness {
        /// Same session and crypt, fresh request and response: the next
        /// request of the same client.
        pub fn next_request(&self, cookie_header: &str) -> Harness {
            build(
                cookie_header,
                Arc::clone(&self.session),
                Arc::clone(&self.crypt),
            )
        }
    }

    /// A container with every cookie collaborator registered.
    pub fn cookie_services(cookie_header: &str) -> Harness {
        build(
            cookie_header,
            Arc::new(MemorySession::new()),
            Arc::new(CountingCrypt::new()),
        )
    }

    fn build(
        cookie_header: &str,
        session: Arc<MemorySession>,
        crypt: Arc<CountingCrypt>,
    ) -> Harness {
        let container = Arc::new(Container::new());
        let request = Arc::new(Request::from_cookie_header(cookie_header));
        let response = Arc::new(ResponseCookies::new());
        container.set_shared("request", Arc::clone(&request));
        container.set_shared("response", Arc::clone(&response));
        container.set_shared("session", Arc::clone(&session) as Arc<dyn Session>);
        container.set_shared("crypt", Arc::clone(&crypt) as Arc<dyn Crypt>);
        container.set_shared("filter", Arc::new(BasicFilter) as Arc<dyn Filter>);
        Harness {
            container,
            request,
            response,
            session,
            crypt,
        }
    }
}

pub mod models {
    use mvcore::db::{Document, Model, Record};
    use serde_json::json;
    use std::sync::Mutex;

    /// Plain model with declared defaults.
    pub struct Product(pub Record);

    impl Model for Product {
        fn source() -> &'static str {
            "products"
        }

        fn declared_fields() -> Document {
            let mut fields = Document::new();
            fields.insert("name".into(), json!(null));
            fields.insert("price".into(), json!(0));
            fields
        }

        fn record(&self) -> &Record {
            &self.0
        }

        fn record_mut(&mut self) -> &mut Record {
            &mut self.0
        }

        fn from_record(record: Record) -> Self {
            Product(record)
        }
    }

    static HOOK_LOG: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    /// Records every lifecycle hook into a process-wide log.
    pub struct Audited(pub Record);

    impl Audited {
        pub fn take_log() -> Vec<&'static str> {
            std::mem::take(&mut *HOOK_LOG.lock().unwrap())
        }
    }

    impl Model for Audited {
        fn source() -> &'static str {
            "audited"
        }

        fn record(&self) -> &Record {
            &self.0
        }

        fn record_mut(&mut self) -> &mut Record {
            &mut self.0
        }

        fn from_record(record: Record) -> Self {
            Audited(record)
        }

        fn before_save(&mut self, _force_insert: bool) {
            HOOK_LOG.lock().unwrap().push("before_save");
        }

        fn after_save(&mut self) {
            HOOK_LOG.lock().unwrap().push("after_save");
        }

        fn before_update(&mut self) {
            HOOK_LOG.lock().unwrap().push("before_update");
        }

        fn after_update(&mut self) {
            HOOK_LOG.lock().unwrap().push("after_update");
        }

        fn before_delete(&mut self) {
            HOOK_LOG.lock().unwrap().push("before_delete");
        }

        fn after_delete(&mut self) {
            HOOK_LOG.lock().unwrap().push("after_delete");
        }
    }

    /// Scoped to one tenant through `filter_binds`.
    pub struct TenantNote(pub Record);

    pub const TENANT: &str = "acme";

    impl Model for TenantNote {
        fn source() -> &'static str {
            "notes"
        }

        fn record(&self) -> &Record {
            &self.0
        }

        fn record_mut(&mut self) -> &mut Record {
            &mut self.0
        }

        fn from_record(record: Record) -> Self {
            TenantNote(record)
        }

        fn filter_binds(mut filter: Document) -> Document {
            filter.insert("tenant".into(), json!(TENANT));
            filter
        }
    }

    /// Lives in a database other than the connection's.
    pub struct AuditEntry(pub Record);

    impl Model for AuditEntry {
        fn source() -> &'static str {
            "entries"
        }

        fn db() -> Option<&'static str> {
            Some("audit")
        }

        fn record(&self) -> &Record {
            &self.0
        }

        fn record_mut(&mut self) -> &mut Record {
            &mut self.0
        }

        fn from_record(record: Record) -> Self {
            AuditEntry(record)
        }
    }
}
