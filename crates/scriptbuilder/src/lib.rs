//! C6: turns a resolved `BootData` into the textual iPXE program a booting
//! node's firmware will parse.

pub mod error;

use std::time::Duration;

use collaborators::{ObjectStoreClient, SpireClient};
use models::BootData;

pub use error::ScriptBuilderError;

/// Per-request context the builder needs beyond the resolved `BootData`.
#[derive(Debug, Clone)]
pub struct ScriptParams {
    pub xname: String,
    pub nid: Option<u32>,
    /// Address nocloud-net datasources are told to fetch cloud-init metadata from.
    pub advertise_address: String,
}

fn has_token(params: &str, prefix: &str) -> bool {
    params.split_whitespace().any(|tok| tok.starts_with(prefix))
}

fn append_token(params: &mut String, token: &str) {
    if !params.is_empty() {
        params.push(' ');
    }
    params.push_str(token);
}

/// Builds the kernel-command-line fragment: concatenation, conditional
/// injection of `xname=`/`nid=`/`ds=`, and `${SPIRE_JOIN_TOKEN}` substitution.
/// Does not touch URLs; see [`build_script`] for the rest of the pipeline.
async fn build_params(
    boot_data: &BootData,
    script_params: &ScriptParams,
    spire: &dyn SpireClient,
) -> Result<String, ScriptBuilderError> {
    let mut params = [
        boot_data.params.as_str(),
        boot_data.kernel.params.as_str(),
        boot_data.initrd.params.as_str(),
    ]
    .into_iter()
    .filter(|p| !p.is_empty())
    .collect::<Vec<_>>()
    .join(" ");

    if !has_token(&params, "xname=") {
        append_token(&mut params, &format!("xname={}", script_params.xname));
    }
    if let Some(nid) = script_params.nid {
        if !has_token(&params, "nid=") {
            append_token(&mut params, &format!("nid={nid}"));
        }
    }
    if !has_token(&params, "ds=") {
        append_token(
            &mut params,
            &format!("ds=nocloud-net;s={}/", script_params.advertise_address),
        );
    }

    if params.contains("${SPIRE_JOIN_TOKEN}") {
        let token = spire.fetch_join_token(&script_params.xname).await?;
        params = params.replace("${SPIRE_JOIN_TOKEN}", &token);
    }

    if !boot_data.initrd.is_empty() {
        params = params
            .split_whitespace()
            .filter(|tok| !tok.starts_with("initrd"))
            .collect::<Vec<_>>()
            .join(" ");
        let mut with_initrd = "initrd=initrd".to_string();
        if !params.is_empty() {
            with_initrd.push(' ');
            with_initrd.push_str(&params);
        }
        params = with_initrd;
    }

    Ok(params)
}

async fn resolve_url(
    path: &str,
    object_store: &dyn ObjectStoreClient,
    presign_valid_for: Duration,
) -> Result<String, ScriptBuilderError> {
    if let Some(stripped) = path.strip_prefix("s3://") {
        let _ = stripped;
        Ok(object_store.presign(path, presign_valid_for).await?)
    } else {
        Ok(path.to_string())
    }
}

/// Assembles the full `#!ipxe` script for `boot_data`. `chain` must already
/// be a verbatim `chain <url>` line used as the retry target.
pub async fn build_script(
    boot_data: &BootData,
    script_params: &ScriptParams,
    chain: &str,
    retry_delay_secs: u64,
    spire: &dyn SpireClient,
    object_store: &dyn ObjectStoreClient,
    presign_valid_for: Duration,
) -> Result<String, ScriptBuilderError> {
    if boot_data.kernel.path.is_empty() {
        return Err(ScriptBuilderError::NotConfigured);
    }

    let params = build_params(boot_data, script_params, spire).await?;
    let kernel_url = resolve_url(&boot_data.kernel.path, object_store, presign_valid_for).await?;

    let mut script = String::from("#!ipxe\n");
    script.push_str("kernel --name kernel ");
    script.push_str(&kernel_url);
    if !params.is_empty() {
        script.push(' ');
        script.push_str(&params);
    }
    script.push_str(" || goto boot_retry\n");

    if !boot_data.initrd.is_empty() {
        let initrd_url = resolve_url(&boot_data.initrd.path, object_store, presign_valid_for).await?;
        script.push_str("initrd --name initrd ");
        script.push_str(&initrd_url);
        script.push_str(" || goto boot_retry\n");
    }

    script.push_str("boot || goto boot_retry\n");
    script.push_str(":boot_retry\n");
    script.push_str(&format!("sleep {retry_delay_secs}\n"));
    script.push_str(chain.trim_end());
    script.push('\n');

    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collaborators::{FakeObjectStoreClient, FakeSpireClient};
    use models::ImageData;

    fn script_params() -> ScriptParams {
        ScriptParams {
            xname: "x0".into(),
            nid: None,
            advertise_address: "https://api-gw-service-nmn.local/apis/bss".into(),
        }
    }

    #[tokio::test]
    async fn fails_when_kernel_path_is_empty() {
        let boot_data = BootData::default();
        let spire = FakeSpireClient::new();
        let object_store = FakeObjectStoreClient;
        let res = build_script(
            &boot_data,
            &script_params(),
            "chain https://self/retry",
            30,
            &spire,
            &object_store,
            Duration::from_secs(86400),
        )
        .await;
        assert!(matches!(res, Err(ScriptBuilderError::NotConfigured)));
    }

    #[tokio::test]
    async fn injects_xname_and_ds_when_absent() {
        let boot_data = BootData {
            params: "quiet".into(),
            kernel: ImageData {
                path: "http://img/k".into(),
                params: String::new(),
            },
            initrd: ImageData {
                path: "http://img/i".into(),
                params: String::new(),
            },
            ..Default::default()
        };
        let spire = FakeSpireClient::new();
        let object_store = FakeObjectStoreClient;
        let script = build_script(
            &boot_data,
            &script_params(),
            "chain https://self/retry",
            30,
            &spire,
            &object_store,
            Duration::from_secs(86400),
        )
        .await
        .unwrap();

        assert!(script.contains("xname=x0"));
        assert!(script.contains("ds=nocloud-net;s=https://api-gw-service-nmn.local/apis/bss/"));
        assert!(script.contains("initrd=initrd"));
        assert!(script.contains("initrd --name initrd http://img/i || goto boot_retry"));
    }

    #[tokio::test]
    async fn idempotent_param_injection() {
        let boot_data = BootData {
            params: "xname=x0 console=ttyS0".into(),
            kernel: ImageData {
                path: "http://img/k".into(),
                params: String::new(),
            },
            ..Default::default()
        };
        let spire = FakeSpireClient::new();
        let object_store = FakeObjectStoreClient;
        let script1 = build_script(
            &boot_data,
            &script_params(),
            "chain https://self/retry",
            30,
            &spire,
            &object_store,
            Duration::from_secs(86400),
        )
        .await
        .unwrap();
        let script2 = build_script(
            &boot_data,
            &script_params(),
            "chain https://self/retry",
            30,
            &spire,
            &object_store,
            Duration::from_secs(86400),
        )
        .await
        .unwrap();
        assert_eq!(script1, script2);
        assert_eq!(script1.matches("xname=").count(), 1);
    }

    #[tokio::test]
    async fn substitutes_spire_join_token() {
        let spire = FakeSpireClient::new();
        spire.seed("x0", "tok-abc");
        let boot_data = BootData {
            params: "spire=${SPIRE_JOIN_TOKEN}".into(),
            kernel: ImageData {
                path: "http://img/k".into(),
                params: String::new(),
            },
            ..Default::default()
        };
        let object_store = FakeObjectStoreClient;
        let script = build_script(
            &boot_data,
            &script_params(),
            "chain https://self/retry",
            30,
            &spire,
            &object_store,
            Duration::from_secs(86400),
        )
        .await
        .unwrap();
        assert!(script.contains("spire=tok-abc"));
    }

    #[tokio::test]
    async fn rewrites_s3_urls_via_presigner() {
        let boot_data = BootData {
            kernel: ImageData {
                path: "s3://bucket/kernel".into(),
                params: String::new(),
            },
            ..Default::default()
        };
        let spire = FakeSpireClient::new();
        let object_store = FakeObjectStoreClient;
        let script = build_script(
            &boot_data,
            &script_params(),
            "chain https://self/retry",
            30,
            &spire,
            &object_store,
            Duration::from_secs(86400),
        )
        .await
        .unwrap();
        assert!(script.contains("https://presigned.example/bucket/kernel"));
    }

    #[test]
    fn shape_matches_documented_template() {
        let regex = regex_lite_check;
        let sample = "#!ipxe\nkernel --name kernel http://k quiet || goto boot_retry\ninitrd --name initrd http://i || goto boot_retry\nboot || goto boot_retry\n:boot_retry\nsleep 30\nchain https://self/retry\n";
        assert!(regex(sample));
    }

    fn regex_lite_check(s: &str) -> bool {
        s.starts_with("#!ipxe\nkernel --name kernel ")
            && s.contains(" || goto boot_retry\n")
            && s.contains("boot || goto boot_retry\n:boot_retry\nsleep ")
            && s.ends_with('\n')
            && s.contains("\nchain ")
    }
}
