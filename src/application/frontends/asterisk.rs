//! `asterisk` resource: PBX engine configuration files.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::application::handler::{
    GenerationContext, HandlerResult, MethodFn, MethodHandler, ResolvedHandler,
};
use crate::domain::entities::{
    MohClassRecord, QueueMemberRecord, QueueRecord, VoicemailRecord,
};

use super::Frontend;
use super::ini::{IniSection, render_sections};

pub struct AsteriskFrontend {
    methods: HashMap<&'static str, ResolvedHandler>,
}

impl AsteriskFrontend {
    pub const NAME: &'static str = "asterisk";

    pub fn new() -> Self {
        let table: [(&'static str, MethodFn); 4] = [
            ("uuid_yml", uuid_yml),
            ("voicemail_conf", voicemail_conf),
            ("queues_conf", queues_conf),
            ("musiconhold_conf", musiconhold_conf),
        ];
        let methods = table
            .into_iter()
            .map(|(name, method)| {
                (name, Arc::new(MethodHandler::new(method)) as ResolvedHandler)
            })
            .collect();
        Self { methods }
    }

    /// Method names this frontend serves, sorted.
    pub fn methods(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.methods.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for AsteriskFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for AsteriskFrontend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn method(&self, method: &str) -> Option<ResolvedHandler> {
        self.methods.get(method).cloned()
    }
}

fn uuid_yml(ctx: &mut GenerationContext) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let infos = ctx.session().infos().await?;
        Ok(Some(format!("uuid: {}\n", infos.uuid)))
    })
}

fn voicemail_conf(ctx: &mut GenerationContext) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let voicemails = ctx.session().voicemails().await?;
        Ok(Some(render_voicemails(&voicemails)?))
    })
}

fn queues_conf(ctx: &mut GenerationContext) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let session = ctx.session();
        let queues = session.queues().await?;
        let members = session.queue_members().await?;
        Ok(Some(render_queues(&queues, &members)?))
    })
}

fn musiconhold_conf(ctx: &mut GenerationContext) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let classes = ctx.session().moh_classes().await?;
        Ok(Some(render_moh_classes(&classes)?))
    })
}

fn render_voicemails(voicemails: &[VoicemailRecord]) -> askama::Result<String> {
    let mut contexts: BTreeMap<&str, IniSection> = BTreeMap::new();
    for voicemail in voicemails {
        let options = voicemail
            .options
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("|");
        let line = format!(
            "{},{},{},{},{}",
            voicemail.password,
            voicemail.fullname,
            voicemail.email.as_deref().unwrap_or(""),
            voicemail.pager.as_deref().unwrap_or(""),
            options
        );
        contexts
            .entry(voicemail.context.as_str())
            .or_insert_with(|| IniSection::new(voicemail.context.as_str()))
            .assign(&voicemail.mailbox, line);
    }
    let sections: Vec<_> = contexts.into_values().collect();
    render_sections(&sections)
}

fn render_queues(queues: &[QueueRecord], members: &[QueueMemberRecord]) -> askama::Result<String> {
    let mut by_queue: HashMap<&str, Vec<&QueueMemberRecord>> = HashMap::new();
    for member in members {
        by_queue
            .entry(member.queue_name.as_str())
            .or_default()
            .push(member);
    }

    let sections: Vec<_> = queues
        .iter()
        .map(|queue| {
            let mut section = IniSection::new(queue.name.as_str());
            for (key, value) in &queue.options {
                section.option(key, value);
            }
            if let Some(members) = by_queue.get_mut(queue.name.as_str()) {
                members.sort_by_key(|member| member.position);
                for member in members.iter() {
                    section.assign("member", format!("{},{}", member.interface, member.penalty));
                }
            }
            section
        })
        .collect();
    render_sections(&sections)
}

fn render_moh_classes(classes: &[MohClassRecord]) -> askama::Result<String> {
    let sections: Vec<_> = classes
        .iter()
        .map(|class| {
            let mut section = IniSection::new(class.name.as_str());
            section.option("mode", &class.mode);
            if let Some(directory) = class.directory.as_deref() {
                section.option("directory", directory);
            }
            if let Some(application) = class.application.as_deref() {
                section.option("application", application);
            }
            if let Some(sort) = class.sort.as_deref() {
                section.option("sort", sort);
            }
            section
        })
        .collect();
    render_sections(&sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repos::DataSource;
    use crate::domain::entities::InfosRecord;
    use crate::domain::keys::HandlerKey;
    use crate::infra::db::{Fixtures, MemoryDataSource};

    async fn generate(frontend: &AsteriskFrontend, filename: &str, fixtures: Fixtures) -> HandlerResult {
        let key = HandlerKey::new(AsteriskFrontend::NAME, filename);
        let handler = frontend.method(&key.method_name()).expect("method exists");
        let source = MemoryDataSource::new(fixtures);
        let session = source.read_only().await.expect("session");
        let mut ctx = GenerationContext::new(key, Vec::new(), session);
        handler.generate(&mut ctx).await
    }

    #[test]
    fn method_table_is_fixed() {
        let frontend = AsteriskFrontend::new();
        assert_eq!(
            frontend.methods(),
            vec!["musiconhold_conf", "queues_conf", "uuid_yml", "voicemail_conf"]
        );
        assert!(frontend.method("sip_conf").is_none());
    }

    #[tokio::test]
    async fn uuid_yml_renders_server_uuid() {
        let fixtures = Fixtures {
            infos: Some(InfosRecord {
                uuid: "abc".to_string(),
            }),
            ..Default::default()
        };
        let output = generate(&AsteriskFrontend::new(), "uuid.yml", fixtures)
            .await
            .expect("generated");
        assert_eq!(output.as_deref(), Some("uuid: abc\n"));
    }

    #[tokio::test]
    async fn uuid_yml_without_infos_row_fails() {
        let result = generate(&AsteriskFrontend::new(), "uuid.yml", Fixtures::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn voicemail_conf_groups_by_context() {
        let fixtures = Fixtures {
            voicemails: vec![
                VoicemailRecord {
                    context: "default".to_string(),
                    mailbox: "1001".to_string(),
                    password: "1234".to_string(),
                    fullname: "Alice".to_string(),
                    email: Some("alice@example.com".to_string()),
                    pager: None,
                    options: vec![("attach".to_string(), "yes".to_string())],
                },
                VoicemailRecord {
                    context: "sales".to_string(),
                    mailbox: "2001".to_string(),
                    password: "0000".to_string(),
                    fullname: "Bob".to_string(),
                    email: None,
                    pager: None,
                    options: Vec::new(),
                },
            ],
            ..Default::default()
        };
        let output = generate(&AsteriskFrontend::new(), "voicemail.conf", fixtures)
            .await
            .expect("generated")
            .expect("content");

        assert_eq!(
            output,
            "[default]\n1001 => 1234,Alice,alice@example.com,,attach=yes\n\n\
             [sales]\n2001 => 0000,Bob,,,\n\n"
        );
    }

    #[tokio::test]
    async fn queues_conf_orders_members_by_position() {
        let fixtures = Fixtures {
            queues: vec![QueueRecord {
                name: "support".to_string(),
                options: vec![("strategy".to_string(), "ringall".to_string())],
            }],
            queue_members: vec![
                QueueMemberRecord {
                    queue_name: "support".to_string(),
                    interface: "PJSIP/second".to_string(),
                    penalty: 1,
                    position: 2,
                },
                QueueMemberRecord {
                    queue_name: "support".to_string(),
                    interface: "PJSIP/first".to_string(),
                    penalty: 0,
                    position: 1,
                },
                QueueMemberRecord {
                    queue_name: "other".to_string(),
                    interface: "PJSIP/elsewhere".to_string(),
                    penalty: 0,
                    position: 1,
                },
            ],
            ..Default::default()
        };
        let output = generate(&AsteriskFrontend::new(), "queues.conf", fixtures)
            .await
            .expect("generated")
            .expect("content");

        assert_eq!(
            output,
            "[support]\nstrategy = ringall\nmember => PJSIP/first,0\nmember => PJSIP/second,1\n\n"
        );
    }

    #[tokio::test]
    async fn musiconhold_conf_skips_missing_options() {
        let fixtures = Fixtures {
            moh_classes: vec![MohClassRecord {
                name: "default".to_string(),
                mode: "files".to_string(),
                directory: Some("/var/lib/moh/default".to_string()),
                application: None,
                sort: Some("random".to_string()),
            }],
            ..Default::default()
        };
        let output = generate(&AsteriskFrontend::new(), "musiconhold.conf", fixtures)
            .await
            .expect("generated")
            .expect("content");

        assert_eq!(
            output,
            "[default]\nmode = files\ndirectory = /var/lib/moh/default\nsort = random\n\n"
        );
    }

    #[tokio::test]
    async fn empty_data_renders_empty_document() {
        let output = generate(&AsteriskFrontend::new(), "voicemail.conf", Fixtures::default())
            .await
            .expect("generated");
        assert_eq!(output.as_deref(), Some(""));
    }
}
