use memsim_core::common::NodeId;
use memsim_core::mem::ReqId;
use memsim_core::noc::{Interconnect, MsgKind};
use mockall::mock;

mock! {
    pub Noc {}
    impl Interconnect for Noc {
        fn insert(&mut self, src: NodeId, dst: NodeId, kind: MsgKind, req: ReqId) -> bool;
        fn inbound(&self, node: NodeId) -> Option<ReqId>;
        fn pop_inbound(&mut self, node: NodeId);
    }
}
