//! End-to-end tests of the standard filter chain.
//!
//! Each test builds a [`Controller`] the way the server does, runs the
//! standard chain and inspects the rendered response.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http_body_util::BodyExt;
use meridian_core::outcome::Text;
use meridian_core::Request;
use meridian_extract::{Binders, Params};
use meridian_i18n::{MessageCatalog, MessageFile};
use meridian_middleware::{Action, Controller, FilterChain};

fn catalog() -> Arc<MessageCatalog> {
    let mut en = MessageFile::new();
    en.insert("DEFAULT", "welcome", "Welcome, %s");
    let mut fr = MessageFile::new();
    fr.insert("DEFAULT", "welcome", "Bienvenue, %s");

    let mut catalog = MessageCatalog::new(Some("en".into()));
    catalog.insert("en", en);
    catalog.insert("fr", fr);
    Arc::new(catalog)
}

fn controller(req: http::Request<Bytes>, action: Action) -> Controller {
    let mut c = Controller::new(
        Request::from_http(req),
        Params::new(Arc::new(Binders::default())),
    )
    .with_catalog(catalog());
    c.set_action(Arc::new(action));
    c
}

async fn render(c: Controller) -> (u16, String) {
    let response = c.finish();
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn welcome(c: &mut Controller, name: String) -> Text {
    Text::new(c.message("welcome", &[&name]))
}

#[tokio::test]
async fn test_localized_action() {
    let chain = FilterChain::standard("APP_LANG", false);
    let req = http::Request::get("/welcome?name=Ines")
        .header("Cookie", "APP_LANG=fr")
        .header("Accept-Language", "en")
        .body(Bytes::new())
        .unwrap();
    let mut c = controller(req, Action::new("App.welcome", &["name"], welcome).unwrap());

    chain.run(&mut c).await;

    assert_eq!(c.render_args()["currentLocale"], "fr");
    assert_eq!(render(c).await, (200, "Bienvenue, Ines".to_string()));
}

#[tokio::test]
async fn test_unknown_language_falls_back_to_default() {
    let chain = FilterChain::standard("APP_LANG", false);
    let req = http::Request::get("/welcome?name=Jo")
        .header("Accept-Language", "pt-BR")
        .body(Bytes::new())
        .unwrap();
    let mut c = controller(req, Action::new("App.welcome", &["name"], welcome).unwrap());

    chain.run(&mut c).await;
    assert_eq!(render(c).await, (200, "Welcome, Jo".to_string()));
}

#[tokio::test]
async fn test_panicking_action_cleans_up_materialized_upload() {
    let seen: Arc<Mutex<Option<PathBuf>>> = Arc::default();
    let store = {
        let seen = Arc::clone(&seen);
        move |_c: &mut Controller, path: PathBuf| -> Text {
            assert!(path.exists(), "upload should be on disk while the action runs");
            *seen.lock().unwrap() = Some(path);
            panic!("disk quota exceeded");
        }
    };

    let body = "--XyZ\r\n\
                Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
                Content-Type: text/plain\r\n\
                \r\n\
                hello\r\n\
                --XyZ--\r\n";
    let req = http::Request::post("/store")
        .header("Content-Type", "multipart/form-data; boundary=XyZ")
        .body(Bytes::from(body))
        .unwrap();

    let chain = FilterChain::standard("APP_LANG", false);
    let mut c = controller(req, Action::new("Docs.store", &["doc"], store).unwrap());
    chain.run(&mut c).await;

    assert_eq!(c.params().pending_cleanup(), 0);
    let path = seen.lock().unwrap().clone().expect("action ran");
    assert!(!path.exists());

    let (status, body) = render(c).await;
    assert_eq!(status, 500);
    assert!(body.contains("disk quota exceeded"));
}
