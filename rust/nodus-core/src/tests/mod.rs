// Tests module
// Admission: mempool spends checked against stored GAS balances
// Wire: envelope and command validation on the framed stream
// Networking: connection manager lifecycle over loopback TCP
// Gossip: two full nodes exchanging transactions

pub mod networking;
