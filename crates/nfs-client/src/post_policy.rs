//! Account-level commands a client posts to its manager groups.
//!
//! Each command is a [`GenericMessage`] signed by the client's fob and sent to
//! the group closest to the fob's name.

use crate::routing::{ResponseFunctor, Routing};
use nfs_core::passport::{self, FobKind, Maid, Mpid};
use nfs_core::{
    Fob, GenericAction, GenericMessage, Identity, Message, MessageToMpah, MpahAction,
    MpidRegistration, NfsError, NodeId, Persona, PersonaId, PmidRegistration, Result,
};
use std::sync::Arc;
use tracing::debug;

/// A signing fob bound to the persona it posts as.
struct ClientPost<R, K> {
    routing: Arc<R>,
    fob: Fob<K>,
    source: PersonaId,
}

impl<R: Routing, K: FobKind> ClientPost<R, K> {
    fn new(routing: Arc<R>, fob: Fob<K>, persona: Persona) -> Self {
        let source = PersonaId::new(persona, routing.node_id());
        Self {
            routing,
            fob,
            source,
        }
    }

    fn name(&self) -> Identity {
        *self.fob.name().value()
    }

    fn send(
        &self,
        action: GenericAction,
        destination_persona: Persona,
        content: Vec<u8>,
        callback: Option<ResponseFunctor>,
    ) -> Result<()> {
        let generic_message = GenericMessage::new(
            action,
            destination_persona,
            self.source,
            self.name(),
            content,
        );
        let serialised = generic_message.serialise()?;
        let signature = passport::sign(&serialised, &self.fob);
        let message = Message::signed(GenericMessage::MESSAGE_CATEGORY, serialised, signature);
        debug!(
            action = ?action,
            destination = ?destination_persona,
            name = %self.name().short(),
            "posting generic message"
        );
        let destination = NodeId::from(self.name());
        let bytes = message.serialise()?;
        self.routing.send_group(destination, bytes, false, callback);
        Ok(())
    }
}

/// Posts PMID (storage node) registrations on behalf of a MAID account.
pub struct ClientMaidPostPolicy<R> {
    post: ClientPost<R, Maid>,
}

impl<R: Routing> ClientMaidPostPolicy<R> {
    pub fn new(routing: Arc<R>, maid: Fob<Maid>) -> Self {
        Self {
            post: ClientPost::new(routing, maid, Persona::ClientMaid),
        }
    }

    /// Asks the maid managers to start accounting for a storage node.
    pub fn register_pmid(
        &self,
        registration: &PmidRegistration,
        callback: Option<ResponseFunctor>,
    ) -> Result<()> {
        self.post_registration(registration, false, GenericAction::RegisterPmid, callback)
    }

    /// `registration` must have been built with `unregister` set.
    pub fn unregister_pmid(
        &self,
        registration: &PmidRegistration,
        callback: Option<ResponseFunctor>,
    ) -> Result<()> {
        self.post_registration(registration, true, GenericAction::UnregisterPmid, callback)
    }

    fn post_registration(
        &self,
        registration: &PmidRegistration,
        unregister: bool,
        action: GenericAction,
        callback: Option<ResponseFunctor>,
    ) -> Result<()> {
        if registration.unregister() != unregister {
            return Err(NfsError::InvalidParameter(format!(
                "{action:?} needs a registration with unregister = {unregister}"
            )));
        }
        if registration.maid_name() != self.post.fob.name() {
            return Err(NfsError::InvalidParameter(
                "registration belongs to another maid".to_string(),
            ));
        }
        self.post.send(
            action,
            Persona::MaidManager,
            registration.serialise()?,
            callback,
        )
    }
}

/// Posts commands to the account holders of an MPID.
pub struct ClientMpidPostPolicy<R> {
    post: ClientPost<R, Mpid>,
}

impl<R: Routing> ClientMpidPostPolicy<R> {
    pub fn new(routing: Arc<R>, mpid: Fob<Mpid>) -> Self {
        Self {
            post: ClientPost::new(routing, mpid, Persona::ClientMpid),
        }
    }

    /// Sends a registration signed by the anonymous MPID to the account holders.
    pub fn register_mpid(
        &self,
        registration: &MpidRegistration,
        callback: Option<ResponseFunctor>,
    ) -> Result<()> {
        self.check_registration(registration, false)?;
        let content = registration.serialise()?;
        self.send_with(MpahAction::RegisterMpid, content, callback)
    }

    pub fn unregister_mpid(
        &self,
        registration: &MpidRegistration,
        callback: Option<ResponseFunctor>,
    ) -> Result<()> {
        self.check_registration(registration, true)?;
        let content = registration.serialise()?;
        self.send_with(MpahAction::UnregisterMpid, content, callback)
    }

    /// Tells the account holders to queue messages until [`Self::go_online`].
    pub fn go_offline(&self, callback: Option<ResponseFunctor>) -> Result<()> {
        self.send(MpahAction::ClientDown, callback)
    }

    pub fn go_online(&self, callback: Option<ResponseFunctor>) -> Result<()> {
        self.send(MpahAction::ClientUp, callback)
    }

    /// Requests messages queued while the client was offline.
    pub fn get_offline_msg(&self, callback: Option<ResponseFunctor>) -> Result<()> {
        self.send(MpahAction::GetOfflineMsg, callback)
    }

    /// `contact` must not be empty; the same holds for the other contact commands.
    pub fn add_contact(&self, contact: Vec<u8>, callback: Option<ResponseFunctor>) -> Result<()> {
        self.send_with(MpahAction::AddContact, contact, callback)
    }

    pub fn block_contact(&self, contact: Vec<u8>, callback: Option<ResponseFunctor>) -> Result<()> {
        self.send_with(MpahAction::BlockContact, contact, callback)
    }

    pub fn mark_spam_contact(
        &self,
        contact: Vec<u8>,
        callback: Option<ResponseFunctor>,
    ) -> Result<()> {
        self.send_with(MpahAction::MarkSpamContact, contact, callback)
    }

    pub fn unmark_spam_contact(
        &self,
        contact: Vec<u8>,
        callback: Option<ResponseFunctor>,
    ) -> Result<()> {
        self.send_with(MpahAction::UnMarkSpamContact, contact, callback)
    }

    pub fn remove_contact(
        &self,
        contact: Vec<u8>,
        callback: Option<ResponseFunctor>,
    ) -> Result<()> {
        self.send_with(MpahAction::RemoveContact, contact, callback)
    }

    pub fn get_contact_list(&self, callback: Option<ResponseFunctor>) -> Result<()> {
        self.send(MpahAction::GetContactList, callback)
    }

    fn check_registration(&self, registration: &MpidRegistration, unregister: bool) -> Result<()> {
        if registration.unregister() != unregister {
            return Err(NfsError::InvalidParameter(format!(
                "expected a registration with unregister = {unregister}"
            )));
        }
        if registration.mpid_name() != self.post.fob.name() {
            return Err(NfsError::InvalidParameter(
                "registration belongs to another mpid".to_string(),
            ));
        }
        Ok(())
    }

    fn send(&self, action: MpahAction, callback: Option<ResponseFunctor>) -> Result<()> {
        self.post_to_mpah(MessageToMpah::new(action, self.post.name()), callback)
    }

    fn send_with(
        &self,
        action: MpahAction,
        content: Vec<u8>,
        callback: Option<ResponseFunctor>,
    ) -> Result<()> {
        if content.is_empty() {
            return Err(NfsError::InvalidParameter(format!(
                "{action:?} needs non-empty content"
            )));
        }
        self.post_to_mpah(
            MessageToMpah::with_content(action, self.post.name(), content),
            callback,
        )
    }

    fn post_to_mpah(
        &self,
        message: MessageToMpah,
        callback: Option<ResponseFunctor>,
    ) -> Result<()> {
        self.post.send(
            GenericAction::MsgToMpah,
            Persona::MpidManager,
            message.serialise()?,
            callback,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfs_core::MessageCategory;
    use nfs_core::passport::{Anmpid, Pmid, check_signature};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CapturingRouting {
        sent: Mutex<Vec<(NodeId, Vec<u8>, bool)>>,
    }

    impl Routing for CapturingRouting {
        fn node_id(&self) -> NodeId {
            NodeId::from(Identity::hash_of(b"client"))
        }

        fn send_group(
            &self,
            destination: NodeId,
            message: Vec<u8>,
            _encrypted: bool,
            callback: Option<ResponseFunctor>,
        ) {
            self.sent
                .lock()
                .push((destination, message, callback.is_some()));
        }
    }

    fn take_one(routing: &CapturingRouting) -> (NodeId, Message, bool) {
        let mut sent = routing.sent.lock();
        assert_eq!(sent.len(), 1);
        let (destination, bytes, has_callback) = sent.remove(0);
        (destination, Message::parse(&bytes).unwrap(), has_callback)
    }

    #[test]
    fn register_pmid_posts_signed_generic_message_to_maid_group() {
        let routing = Arc::new(CapturingRouting::default());
        let maid = Fob::<Maid>::generate();
        let public_maid = maid.public_fob();
        let pmid = Fob::<Pmid>::generate();
        let registration = PmidRegistration::new(&maid, &pmid, false).unwrap();
        let policy = ClientMaidPostPolicy::new(Arc::clone(&routing), maid);

        policy
            .register_pmid(&registration, Some(Box::new(|_: Vec<u8>| {})))
            .unwrap();

        let (destination, message, has_callback) = take_one(&routing);
        assert!(has_callback);
        assert_eq!(destination, NodeId::from(*public_maid.name().value()));
        let category = message.inner_message_type();
        assert_eq!(category, MessageCategory::GenericMessage);
        let signature = message.signature().unwrap();
        let inner = message.serialised_inner_message();
        assert!(check_signature(inner, signature, &public_maid));

        let generic = GenericMessage::parse(inner).unwrap();
        assert_eq!(generic.action(), GenericAction::RegisterPmid);
        assert_eq!(generic.destination_persona(), Persona::MaidManager);
        assert_eq!(generic.source().persona, Persona::ClientMaid);
        assert_eq!(generic.source().node_id, routing.node_id());
        let carried = PmidRegistration::parse(generic.content()).unwrap();
        assert!(carried.validate(&public_maid, &pmid.public_fob()));
    }

    #[test]
    fn registration_flag_must_match_command() {
        let routing = Arc::new(CapturingRouting::default());
        let maid = Fob::<Maid>::generate();
        let pmid = Fob::<Pmid>::generate();
        let unregistration = PmidRegistration::new(&maid, &pmid, true).unwrap();
        let policy = ClientMaidPostPolicy::new(Arc::clone(&routing), maid);

        assert!(matches!(
            policy.register_pmid(&unregistration, None),
            Err(NfsError::InvalidParameter(_))
        ));
        policy.unregister_pmid(&unregistration, None).unwrap();
        let (_, message, _) = take_one(&routing);
        let generic = GenericMessage::parse(message.serialised_inner_message()).unwrap();
        assert_eq!(generic.action(), GenericAction::UnregisterPmid);
    }

    #[test]
    fn foreign_registration_is_rejected() {
        let routing = Arc::new(CapturingRouting::default());
        let other_maid = Fob::<Maid>::generate();
        let registration =
            PmidRegistration::new(&other_maid, &Fob::<Pmid>::generate(), false).unwrap();
        let policy = ClientMaidPostPolicy::new(Arc::clone(&routing), Fob::<Maid>::generate());

        assert!(policy.register_pmid(&registration, None).is_err());
        assert!(routing.sent.lock().is_empty());
    }

    #[test]
    fn mpid_commands_reach_mpid_managers() {
        let routing = Arc::new(CapturingRouting::default());
        let mpid = Fob::<Mpid>::generate();
        let mpid_name = *mpid.name().value();
        let policy = ClientMpidPostPolicy::new(Arc::clone(&routing), mpid);

        policy.add_contact(b"alice".to_vec(), None).unwrap();

        let (destination, message, _) = take_one(&routing);
        assert_eq!(destination, NodeId::from(mpid_name));
        let generic = GenericMessage::parse(message.serialised_inner_message()).unwrap();
        assert_eq!(generic.action(), GenericAction::MsgToMpah);
        assert_eq!(generic.destination_persona(), Persona::MpidManager);
        assert_eq!(generic.source().persona, Persona::ClientMpid);
        let to_mpah = MessageToMpah::parse(generic.content()).unwrap();
        assert_eq!(to_mpah.action(), MpahAction::AddContact);
        assert_eq!(to_mpah.mpid_name(), &mpid_name);
        assert_eq!(to_mpah.content(), Some(&b"alice"[..]));
    }

    #[test]
    fn mpid_presence_commands_carry_no_content() {
        let routing = Arc::new(CapturingRouting::default());
        let policy = ClientMpidPostPolicy::new(Arc::clone(&routing), Fob::<Mpid>::generate());

        policy.go_offline(None).unwrap();
        policy.go_online(None).unwrap();
        policy.get_contact_list(None).unwrap();

        let actions: Vec<_> = routing
            .sent
            .lock()
            .iter()
            .map(|(_, bytes, _)| {
                let message = Message::parse(bytes).unwrap();
                let generic = GenericMessage::parse(message.serialised_inner_message()).unwrap();
                let to_mpah = MessageToMpah::parse(generic.content()).unwrap();
                assert_eq!(to_mpah.content(), None);
                to_mpah.action()
            })
            .collect();
        assert_eq!(
            actions,
            vec![
                MpahAction::ClientDown,
                MpahAction::ClientUp,
                MpahAction::GetContactList
            ]
        );
    }

    #[test]
    fn register_mpid_carries_registration() {
        let routing = Arc::new(CapturingRouting::default());
        let anmpid = Fob::<Anmpid>::generate();
        let mpid = Fob::<Mpid>::generate();
        let public_mpid = mpid.public_fob();
        let registration = MpidRegistration::new(&anmpid, &mpid, false).unwrap();
        let policy = ClientMpidPostPolicy::new(Arc::clone(&routing), mpid);

        policy.register_mpid(&registration, None).unwrap();

        let (_, message, _) = take_one(&routing);
        let generic = GenericMessage::parse(message.serialised_inner_message()).unwrap();
        let to_mpah = MessageToMpah::parse(generic.content()).unwrap();
        assert_eq!(to_mpah.action(), MpahAction::RegisterMpid);
        let carried = MpidRegistration::parse(to_mpah.content().unwrap()).unwrap();
        assert!(carried.validate(&anmpid.public_fob(), &public_mpid));
    }

    #[test]
    fn empty_contact_is_rejected() {
        let routing = Arc::new(CapturingRouting::default());
        let policy = ClientMpidPostPolicy::new(Arc::clone(&routing), Fob::<Mpid>::generate());
        assert!(matches!(
            policy.block_contact(Vec::new(), None),
            Err(NfsError::InvalidParameter(_))
        ));
    }
}
